//! Probe attributes: the attribution record attached to checker results.
//!
//! Also home of the display-id helpers: a stable short identifier is
//! derived from the host's "essence" (public suffix and noise stripped,
//! vowels sacrificed first) plus a short content hash, prefixed with the
//! country code.

use std::net::IpAddr;
use std::net::Ipv4Addr;

use sha1::{Digest, Sha1};
use url::Url;

use dpiprobe_common::error::ProbeFailure;

use crate::intel::IntelLookup;

/// Attribution attached to a probed endpoint, for classification and
/// display by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointAttrs {
    pub id: String,
    pub url: String,
    pub host: String,
    pub ip_addr: Option<Ipv4Addr>,
    pub subnet: String,
    pub asn: u32,
    pub org: String,
    pub country_iso: String,
    pub country_flag: String,
}

/// Resolves the endpoint's host and attributes the first IPv4 answer
/// through the store.
pub async fn endpoint_attrs(
    endpoint_url: &str,
    intel: &dyn IntelLookup,
) -> Result<EndpointAttrs, ProbeFailure> {
    let parsed = Url::parse(endpoint_url).map_err(|_| ProbeFailure::Internal)?;
    let host = parsed.host_str().ok_or(ProbeFailure::Internal)?.to_string();
    let port = parsed.port_or_known_default().unwrap_or(443);

    let mut attrs = EndpointAttrs {
        url: endpoint_url.to_string(),
        host: host.clone(),
        ..EndpointAttrs::default()
    };

    let resolved = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|_| ProbeFailure::ConnectionError)?;
    let ip = resolved
        .filter_map(|sock| match sock.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or(ProbeFailure::ConnectionError)?;
    attrs.ip_addr = Some(ip);

    let info = intel.ip_info(ip);
    attrs.asn = info.asn;
    attrs.org = strip_org_suffix(&info.org);
    attrs.subnet = info.subnet.to_string();

    if info.country_iso.len() < 2 {
        attrs.country_iso = "XX".into();
    } else {
        attrs.country_flag = country_flag(&info.country_iso);
        attrs.country_iso = info.country_iso;
    }

    attrs.id = endpoint_id(&attrs);
    Ok(attrs)
}

/// Country, host token, short hash: the country and address parts change
/// between runs and datasets, the middle token keeps the id recognizable.
fn endpoint_id(attrs: &EndpointAttrs) -> String {
    let ip = attrs.ip_addr.map(|i| i.to_string()).unwrap_or_default();
    let token = strip_host_to_n(&attrs.host, 5);
    let hash = hash_hex(&format!("{}{}", attrs.url, ip), 2);
    format!("{}.{}-{}", attrs.country_iso, token, hash)
}

/// First `len` hex chars of the SHA-1 of `data`, uppercase.
pub fn hash_hex(data: &str, len: usize) -> String {
    let digest = Sha1::digest(data.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02X}")).collect();
    if len >= hex.len() { hex } else { hex[..len].to_string() }
}

/// Squeezes a host name down to at most `k` characters: essence first,
/// vowels next, then evenly sampled characters.
pub fn strip_host_to_n(host: &str, k: usize) -> String {
    if k == 0 {
        return String::new();
    }

    let s = essence_host(host);
    let s = strip_vowels(&s, k);

    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();

    if n == 0 {
        return String::new();
    }
    if n <= k {
        return s;
    }
    if k == 1 {
        return chars[0].to_string();
    }

    (0..k).map(|i| chars[i * (n - 1) / (k - 1)]).collect()
}

/// Common multi-label public suffixes worth recognizing; everything else
/// loses its final label only.
const COMPOUND_SUFFIXES: &[&str] = &[
    "CO.UK", "ORG.UK", "AC.UK", "COM.AU", "NET.AU", "COM.BR", "CO.JP", "COM.TR", "CO.IL",
    "COM.RU", "MSK.RU", "SPB.RU",
];

/// Upper-cased host with its public suffix, `WWW.` prefix, dots and
/// hyphens removed.
fn essence_host(host: &str) -> String {
    let mut s = host.trim().to_uppercase();
    s = s.trim_end_matches('.').to_string();

    let mut stripped = false;
    for suffix in COMPOUND_SUFFIXES {
        if let Some(head) = s.strip_suffix(&format!(".{suffix}")) {
            s = head.to_string();
            stripped = true;
            break;
        }
    }
    if !stripped {
        if let Some(dot) = s.rfind('.') {
            // a lone label has no suffix to strip
            if dot > 0 {
                s.truncate(dot);
            }
        }
    }

    s = s.strip_prefix("WWW.").unwrap_or(&s).to_string();
    s.retain(|c| c != '.' && c != '-');
    s
}

/// Drops vowels from the interior, never the first or last character,
/// and stops once the string would shrink below `k`.
fn strip_vowels(s: &str, k: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let n = chars.len();
    if n <= 2 || n <= k {
        return s.to_string();
    }

    let mut out = vec![chars[0]];
    for (i, &c) in chars.iter().enumerate().take(n - 1).skip(1) {
        let is_vowel = matches!(c, 'A' | 'E' | 'I' | 'O' | 'U' | 'Y');
        let remaining = out.len() + (n - i);
        if is_vowel && remaining >= k {
            continue;
        }
        out.push(c);
    }
    out.push(chars[n - 1]);
    out.into_iter().collect()
}

/// Regional-indicator pair for a two-letter ISO code; empty for anything
/// else.
pub fn country_flag(iso: &str) -> String {
    let chars: Vec<char> = iso.chars().collect();
    if chars.len() != 2 {
        return String::new();
    }

    let mut out = String::new();
    for c in chars {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return String::new();
        }
        let offset = (c as u32) - ('A' as u32);
        match char::from_u32(0x1F1E6 + offset) {
            Some(glyph) => out.push(glyph),
            None => return String::new(),
        }
    }
    out
}

/// Drops legal-form suffixes so organization names stay short in reports.
pub fn strip_org_suffix(org: &str) -> String {
    let mut s = org.strip_prefix("The ").unwrap_or(org).to_string();
    // ordering matters: "S.A.S." before "S.A."
    for form in [" GmbH", " LLC", " Corporation", " Company", " S.A.S.", " S.A.", " SAS", " UAB"] {
        s = s.replace(form, "");
    }
    s
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
