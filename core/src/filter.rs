//! # Subnet Filter Engine
//!
//! A small expression language selecting address sets out of the
//! intelligence store. Five primitives over string/integer arguments,
//! combined with `&&` (intersection) and `||` (union):
//!
//! ```text
//! org("yandex") && country("ru")
//! subnet("10.0.0.0/8", "31.44.8.24") || as(13238)
//! ```
//!
//! This is set algebra, not control flow: both operands of an operator are
//! always evaluated. Operators share one precedence level and associate
//! left; parenthesize to group. Compilation catches malformed syntax and
//! unknown identifiers; evaluation catches argument kinds a primitive does
//! not accept.

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;

use dpiprobe_common::error::FilterError;
use dpiprobe_common::net::set::{AddrSet, AddrSetBuilder};

use crate::intel::{CidrQuery, IntelLookup};

mod parse;

/// The five selectable sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Host,
    Subnet,
    As,
    Org,
    Country,
}

impl Primitive {
    fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "host" => Some(Self::Host),
            "subnet" => Some(Self::Subnet),
            "as" => Some(Self::As),
            "org" => Some(Self::Org),
            "country" => Some(Self::Country),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Subnet => "subnet",
            Self::As => "as",
            Self::Org => "org",
            Self::Country => "country",
        }
    }
}

/// A primitive argument. The closed variant set lets every primitive match
/// exhaustively instead of inspecting types at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Int(u32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Call { prim: Primitive, args: Vec<Arg> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A compiled filter. Immutable; evaluating it against the same store state
/// always yields the same set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    root: Expr,
}

/// Compiles filter text into a [`Program`].
pub fn compile(text: &str) -> Result<Program, FilterError> {
    parse::parse(text).map(|root| Program { root })
}

/// Evaluates compiled filters against one intelligence store.
pub struct FilterEngine<'a> {
    intel: &'a dyn IntelLookup,
}

impl<'a> FilterEngine<'a> {
    pub fn new(intel: &'a dyn IntelLookup) -> Self {
        Self { intel }
    }

    pub fn eval(&self, program: &Program) -> Result<AddrSet, FilterError> {
        self.eval_expr(&program.root)
    }

    fn eval_expr(&self, expr: &Expr) -> Result<AddrSet, FilterError> {
        match expr {
            Expr::And(a, b) => {
                let (a, b) = (self.eval_expr(a)?, self.eval_expr(b)?);
                Ok(a.intersection(&b))
            }
            Expr::Or(a, b) => {
                let (a, b) = (self.eval_expr(a)?, self.eval_expr(b)?);
                Ok(a.union(&b))
            }
            Expr::Call { prim, args } => match prim {
                Primitive::Host => self.eval_host(args),
                Primitive::Subnet => self.eval_subnet(args),
                Primitive::As => self.eval_as(args),
                Primitive::Org => self.eval_org(args),
                Primitive::Country => self.eval_country(args),
            },
        }
    }

    fn eval_host(&self, args: &[Arg]) -> Result<AddrSet, FilterError> {
        let mut hosts = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Text(name) => hosts.push(name.clone()),
                Arg::Int(v) => return Err(arg_error(Primitive::Host, "hostname", v)),
            }
        }
        // The store owns the refusal, so the message is the same whether the
        // criterion arrives through a filter or a direct query.
        self.intel.cidrs(&CidrQuery { hosts, ..CidrQuery::default() })
    }

    /// Literal CIDRs pass through; literal addresses expand to their
    /// containing subnets via the store.
    fn eval_subnet(&self, args: &[Arg]) -> Result<AddrSet, FilterError> {
        let mut b = AddrSetBuilder::new();
        let mut ips = Vec::new();

        for arg in args {
            match arg {
                Arg::Text(v) if v.contains('/') => {
                    let net: Ipv4Network = v.parse().map_err(|_| {
                        FilterError::Eval(format!("subnet(): invalid cidr `{v}`"))
                    })?;
                    b.add_prefix(net);
                }
                Arg::Text(v) => {
                    let ip: Ipv4Addr = v.parse().map_err(|_| {
                        FilterError::Eval(format!(
                            "subnet(): expected cidr or ipv4 address, got `{v}`"
                        ))
                    })?;
                    ips.push(ip);
                }
                Arg::Int(v) => return Err(arg_error(Primitive::Subnet, "cidr or ip", v)),
            }
        }

        dedup(&mut ips);
        let expanded = self.intel.cidrs(&CidrQuery { ips, ..CidrQuery::default() })?;
        b.add_set(&expanded);
        Ok(b.build())
    }

    /// ASNs pass through; literal addresses expand to their covering ASNs.
    fn eval_as(&self, args: &[Arg]) -> Result<AddrSet, FilterError> {
        let mut asns = Vec::new();
        let mut ips = Vec::new();

        for arg in args {
            match arg {
                Arg::Int(asn) => asns.push(*asn),
                Arg::Text(v) => {
                    let ip: Ipv4Addr = v.parse().map_err(|_| {
                        FilterError::Eval(format!(
                            "as(): expected asn or ipv4 address, got `{v}`"
                        ))
                    })?;
                    ips.push(ip);
                }
            }
        }

        dedup(&mut ips);
        asns.extend(self.intel.asns(&ips));
        dedup(&mut asns);

        self.intel.cidrs(&CidrQuery { asns, ..CidrQuery::default() })
    }

    /// Name substrings pass through lower-cased; ASNs and addresses expand
    /// to the organization names on their records first.
    fn eval_org(&self, args: &[Arg]) -> Result<AddrSet, FilterError> {
        let mut terms = Vec::new();
        let mut asns = Vec::new();
        let mut ips = Vec::new();

        for arg in args {
            match arg {
                Arg::Int(asn) => asns.push(*asn),
                Arg::Text(v) => match v.parse::<Ipv4Addr>() {
                    Ok(ip) => ips.push(ip),
                    Err(_) => terms.push(v.trim().to_lowercase()),
                },
            }
        }

        dedup(&mut ips);
        dedup(&mut asns);
        terms.extend(self.intel.org_terms(&ips, &asns));

        self.intel.cidrs(&CidrQuery { org_terms: terms, ..CidrQuery::default() })
    }

    fn eval_country(&self, args: &[Arg]) -> Result<AddrSet, FilterError> {
        let mut codes = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Text(code) => codes.push(code.clone()),
                Arg::Int(v) => return Err(arg_error(Primitive::Country, "iso code", v)),
            }
        }
        self.intel.cidrs(&CidrQuery { country_codes: codes, ..CidrQuery::default() })
    }
}

fn arg_error(prim: Primitive, wanted: &str, got: &u32) -> FilterError {
    FilterError::Eval(format!("{}(): expected {wanted}, got `{got}`", prim.name()))
}

fn dedup<T: Ord>(values: &mut Vec<T>) {
    values.sort_unstable();
    values.dedup();
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::test_store;

    fn run(filter: &str) -> Result<AddrSet, FilterError> {
        let store = test_store();
        let program = compile(filter)?;
        FilterEngine::new(&store).eval(&program)
    }

    fn prefixes(filter: &str) -> Vec<String> {
        run(filter).unwrap().prefixes().iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn country_selects_fixture_prefixes() {
        assert_eq!(prefixes(r#"country("ru")"#), vec!["31.44.8.0/21", "37.9.64.0/24"]);
        assert_eq!(
            prefixes(r#"country("us", "au")"#),
            vec!["1.0.0.0/24", "34.0.128.0/19", "68.169.48.0/20"]
        );
    }

    #[test]
    fn org_terms_are_lowercased_internally() {
        let want = vec![
            "1.179.112.0/20",
            "2.56.250.0/24",
            "34.0.128.0/19",
            "193.186.4.0/24",
        ];
        assert_eq!(prefixes(r#"org("google")"#), want);
        assert_eq!(prefixes(r#"org("Google")"#), want);
    }

    #[test]
    fn org_selects_yandex_fixture() {
        assert_eq!(
            prefixes(r#"org("yandex")"#),
            vec!["5.45.192.0/18", "31.44.8.0/21", "37.9.64.0/24"]
        );
    }

    #[test]
    fn and_is_set_intersection() {
        let got = run(r#"org("yandex") && country("ru")"#).unwrap();
        let yandex = run(r#"org("yandex")"#).unwrap();
        let ru = run(r#"country("ru")"#).unwrap();

        let want: Vec<String> = ["31.44.8.0/21", "37.9.64.0/24"].map(String::from).into();
        let got_strs: Vec<String> = got.prefixes().iter().map(|p| p.to_string()).collect();
        assert_eq!(got_strs, want);

        // and the intersection is a subset of both operands
        for r in got.ranges() {
            assert!(yandex.contains(r.start_addr) && yandex.contains(r.end_addr));
            assert!(ru.contains(r.start_addr) && ru.contains(r.end_addr));
        }
    }

    #[test]
    fn or_is_set_union() {
        assert_eq!(
            prefixes(r#"country("ru") || country("au")"#),
            vec!["1.0.0.0/24", "31.44.8.0/21", "37.9.64.0/24"]
        );
    }

    #[test]
    fn subnet_passes_literal_cidr_through() {
        assert_eq!(prefixes(r#"subnet("192.168.0.1/32")"#), vec!["192.168.0.1/32"]);
    }

    #[test]
    fn subnet_expands_bare_address_via_store() {
        assert_eq!(prefixes(r#"subnet("31.44.8.24")"#), vec!["31.44.8.0/21"]);
    }

    #[test]
    fn as_accepts_numbers_and_addresses() {
        assert_eq!(
            prefixes("as(15169)"),
            vec!["1.179.112.0/20", "34.0.128.0/19", "193.186.4.0/24"]
        );
        assert_eq!(prefixes(r#"as("31.44.8.24")"#), vec!["31.44.8.0/21"]);
    }

    #[test]
    fn org_expands_asn_to_exact_name_terms() {
        // AS13238 maps to "Yandex LLC"; only records containing that full
        // name match, not every yandex-ish organization.
        assert_eq!(prefixes("org(13238)"), vec!["5.45.192.0/18", "37.9.64.0/24"]);
    }

    #[test]
    fn empty_argument_lists_select_nothing() {
        assert!(run("subnet()").unwrap().is_empty());
        assert!(run(r#"country("ru") && subnet()"#).unwrap().is_empty());
    }

    #[test]
    fn host_is_not_implemented() {
        let err = run(r#"host("example.org")"#).unwrap_err();
        assert!(matches!(err, FilterError::Eval(msg) if msg.contains("not implemented")));
    }

    #[test]
    fn syntax_errors_are_caught_at_compile_time() {
        assert!(matches!(compile("nope(1)"), Err(FilterError::Syntax(_))));
        assert!(matches!(compile(r#"org("a""#), Err(FilterError::Syntax(_))));
        assert!(matches!(compile("org(,)"), Err(FilterError::Syntax(_))));
        assert!(matches!(compile(r#"org("a") &"#), Err(FilterError::Syntax(_))));
        assert!(matches!(compile(""), Err(FilterError::Syntax(_))));
        assert!(matches!(compile(r#"country("ru") country("us")"#), Err(FilterError::Syntax(_))));
    }

    #[test]
    fn eval_rejects_mismatched_argument_kinds() {
        assert!(matches!(run("country(42)"), Err(FilterError::Eval(_))));
        assert!(matches!(run(r#"as("google")"#), Err(FilterError::Eval(_))));
        assert!(matches!(run("subnet(8)"), Err(FilterError::Eval(_))));
    }

    #[test]
    fn parentheses_group_subexpressions() {
        assert_eq!(
            prefixes(r#"(org("yandex") || org("google")) && country("ru")"#),
            vec!["31.44.8.0/21", "37.9.64.0/24"]
        );
    }
}
