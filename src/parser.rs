//! Parsers for the grammar configuration surface and for expressions.
//!
//! # Grammar syntax
//!
//! A grammar is a sequence of declarations, defined below in [augmented
//! Backus-Naur form]. The left-hand side of the first declaration is the
//! grammar's start type.
//!
//! ```text
//! grammar     = *wsp *( *comment declaration ";" *comment ) *wsp
//!
//! declaration = *wsp type *wsp ":" *wsp production *wsp "@" *wsp weight *wsp
//!
//! production  = seq-literal / count-literal / operator "(" type *( "," type ) ")"
//! ```
//!
//! `type` is `Seq` or `Count`; `seq-literal` is a double-quoted string over
//! `{'0','1'}`; `count-literal` is a bare integer; `operator` is one of
//! `repeat_`, `concat_`, `bflip_`, `rev_`; `weight` is a positive decimal.
//! Comments run from `#` to the end of the line. For example:
//!
//! ```text
//! # binary digits
//! Seq: "1" @ 6.0;
//! Seq: "0" @ 6.0;
//! Seq: repeat_(Seq, Count) @ 1.0;
//! Count: 3 @ 0.625;
//! ```
//!
//! # Expression syntax
//!
//! Expressions use the same literals and operator symbols with parenthesized
//! comma-separated arguments, e.g. `concat_(repeat_("1", 3), "0")`, and are
//! resolved against a [`Grammar`] with full type- and arity-checking.
//!
//! [augmented Backus-Naur form]: https://en.wikipedia.org/wiki/Augmented_Backus–Naur_form
//! [`Grammar`]: ../grammar/struct.Grammar.html

use crate::expr::{Expr, Op, Value};
use crate::grammar::{Grammar, GrammarBuilder, GrammarError, Ty};
use nom::types::CompleteStr;
use nom::{digit, Context as Nomtext, Err};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
/// The error type for parsing operations.
pub enum ParseError {
    /// The input is not well-formed under the surface syntax.
    Syntax,
    /// A type name other than `Seq` or `Count`.
    UnknownType(String),
    /// An operator or literal with no counterpart in the language.
    UnknownSymbol(String),
    /// A known symbol used where the grammar expects a different type.
    UnexpectedType { symbol: String, expected: Ty },
    /// A known operator applied to the wrong number of arguments.
    ArityMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },
    /// The declarations parsed but failed grammar validation.
    Grammar(GrammarError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::Syntax => write!(f, "failed parse"),
            ParseError::UnknownType(ref name) => write!(f, "unknown type {}", name),
            ParseError::UnknownSymbol(ref name) => write!(f, "unknown symbol {}", name),
            ParseError::UnexpectedType {
                ref symbol,
                expected,
            } => write!(f, "{} cannot produce the expected type {}", symbol, expected),
            ParseError::ArityMismatch {
                ref symbol,
                expected,
                found,
            } => write!(
                f,
                "{} takes {} arguments but was given {}",
                symbol, expected, found
            ),
            ParseError::Grammar(ref e) => write!(f, "invalid grammar: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<GrammarError> for ParseError {
    fn from(e: GrammarError) -> ParseError {
        ParseError::Grammar(e)
    }
}

lazy_static! {
    static ref OPERATORS: HashMap<&'static str, Op> = hashmap! {
        "repeat_" => Op::Repeat,
        "concat_" => Op::Concat,
        "bflip_" => Op::BitFlip,
        "rev_" => Op::Reverse,
    };
}

#[derive(Debug, Clone, PartialEq)]
enum RawExpr {
    Seq(String),
    Count(usize),
    App(String, Vec<RawExpr>),
}

#[derive(Debug, Clone, PartialEq)]
enum RawRhs {
    Seq(String),
    Count(usize),
    App(String, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct RawDecl {
    lhs: String,
    rhs: RawRhs,
    weight: f64,
}

// reserved characters: quotes, grouping, separators, the weight marker, and
// comment/whitespace characters
named!(identifier<CompleteStr, CompleteStr>, is_not!("\"(),;:@# \t\r\n"));
named!(seq_literal<CompleteStr, CompleteStr>,
       delimited!(tag!("\""), take_until!("\""), tag!("\"")));
named!(comment<CompleteStr, ()>,
       map!(preceded!(tag!("#"), take_until_and_consume!("\n")), |_| ()));

named!(raw_expr<CompleteStr, RawExpr>,
       alt!(map!(seq_literal, |s| RawExpr::Seq(s.to_string()))
            | map!(do_parse!(name: identifier >>
                             args: delimited!(tag!("("),
                                              separated_list!(tag!(","), ws!(raw_expr)),
                                              tag!(")")) >>
                             (name, args)),
                   |(n, a)| RawExpr::App(n.to_string(), a))
            | map!(digit, |d: CompleteStr| RawExpr::Count(d.parse::<usize>().unwrap()))));

named!(type_list<CompleteStr, Vec<CompleteStr>>,
       delimited!(tag!("("),
                  separated_list!(tag!(","), ws!(identifier)),
                  tag!(")")));
named!(production<CompleteStr, RawRhs>,
       alt!(map!(seq_literal, |s| RawRhs::Seq(s.to_string()))
            | map!(do_parse!(name: identifier >>
                             args: type_list >>
                             (name, args)),
                   |(n, a): (CompleteStr, Vec<CompleteStr>)|
                       RawRhs::App(n.to_string(), a.iter().map(|t| t.to_string()).collect()))
            | map!(digit, |d: CompleteStr| RawRhs::Count(d.parse::<usize>().unwrap()))));

named!(weight_text<CompleteStr, CompleteStr>, is_not!(" \t\r\n;"));
fn weight(input: CompleteStr) -> nom::IResult<CompleteStr, f64> {
    let (rest, text) = weight_text(input)?;
    match text.parse::<f64>() {
        Ok(w) => Ok((rest, w)),
        Err(_) => Err(Err::Error(Nomtext::Code(input, nom::ErrorKind::Custom(0)))),
    }
}

named!(declaration<CompleteStr, RawDecl>,
       ws!(do_parse!(lhs: identifier >>
                     tag!(":") >>
                     production: production >>
                     tag!("@") >>
                     weight: weight >>
                     (RawDecl { lhs: lhs.to_string(), rhs: production, weight }))));

fn declarations<'a>(
    input: CompleteStr<'a>,
    decls: &mut Vec<RawDecl>,
) -> nom::IResult<CompleteStr<'a>, ()> {
    map!(
        input,
        ws!(many0!(do_parse!(
            many0!(ws!(comment))
                >> text: take_until_and_consume!(";")
                >> expr_res!(push_declaration(text, decls))
                >> many0!(ws!(comment))
                >> ()
        ))),
        |_| ()
    )
}

fn push_declaration(text: CompleteStr, decls: &mut Vec<RawDecl>) -> Result<(), ()> {
    match declaration(text) {
        Ok((rest, decl)) if rest.trim().is_empty() => {
            decls.push(decl);
            Ok(())
        }
        _ => Err(()),
    }
}

fn ty_from_name(name: &str) -> Result<Ty, ParseError> {
    match name {
        "Seq" => Ok(Ty::Seq),
        "Count" => Ok(Ty::Count),
        _ => Err(ParseError::UnknownType(name.to_string())),
    }
}

/// Parse a textual grammar configuration into a validated [`Grammar`].
///
/// The first declaration's left-hand side becomes the start type. Builder
/// validation failures surface as [`ParseError::Grammar`].
///
/// [`Grammar`]: ../grammar/struct.Grammar.html
/// [`ParseError::Grammar`]: enum.ParseError.html#variant.Grammar
pub fn parse_grammar(input: &str) -> Result<Grammar, ParseError> {
    let mut decls = Vec::new();
    let rest = match declarations(CompleteStr(input), &mut decls) {
        Ok((rest, ())) => rest,
        Err(_) => return Err(ParseError::Syntax),
    };
    if !rest.trim().is_empty() || decls.is_empty() {
        return Err(ParseError::Syntax);
    }
    let start = ty_from_name(&decls[0].lhs)?;
    let mut builder = GrammarBuilder::new(start);
    for decl in &decls {
        let lhs = ty_from_name(&decl.lhs)?;
        let (op, arg_types) = match decl.rhs {
            RawRhs::Seq(ref s) => (Op::Lit(Value::Seq(s.clone())), Vec::new()),
            RawRhs::Count(n) => (Op::Lit(Value::Count(n)), Vec::new()),
            RawRhs::App(ref name, ref tys) => {
                let op = OPERATORS
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| ParseError::UnknownSymbol(name.clone()))?;
                let tys = tys
                    .iter()
                    .map(|t| ty_from_name(t))
                    .collect::<Result<Vec<_>, _>>()?;
                (op, tys)
            }
        };
        builder = builder.rule(lhs, op, &arg_types, decl.weight);
    }
    builder.build().map_err(ParseError::from)
}

/// Parse an expression and resolve it against `grammar`, starting from the
/// grammar's start type.
pub fn parse_expr(input: &str, grammar: &Grammar) -> Result<Expr, ParseError> {
    let (rest, raw) = ws!(CompleteStr(input), raw_expr).map_err(|_| ParseError::Syntax)?;
    if !rest.trim().is_empty() {
        return Err(ParseError::Syntax);
    }
    resolve(&raw, grammar.start(), grammar)
}

fn resolve(raw: &RawExpr, ty: Ty, grammar: &Grammar) -> Result<Expr, ParseError> {
    match *raw {
        RawExpr::Seq(ref s) => resolve_literal(Value::Seq(s.clone()), ty, grammar),
        RawExpr::Count(n) => resolve_literal(Value::Count(n), ty, grammar),
        RawExpr::App(ref name, ref args) => {
            let op = OPERATORS
                .get(name.as_str())
                .ok_or_else(|| ParseError::UnknownSymbol(name.clone()))?;
            let id = grammar
                .find_rule(ty, op)
                .ok_or_else(|| ParseError::UnexpectedType {
                    symbol: name.clone(),
                    expected: ty,
                })?;
            let rule = grammar.rule(id);
            if rule.arg_types.len() != args.len() {
                return Err(ParseError::ArityMismatch {
                    symbol: name.clone(),
                    expected: rule.arg_types.len(),
                    found: args.len(),
                });
            }
            let children = args
                .iter()
                .zip(rule.arg_types.iter())
                .map(|(arg, arg_ty)| resolve(arg, *arg_ty, grammar))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::new(id, rule.op.clone(), children))
        }
    }
}

fn resolve_literal(value: Value, ty: Ty, grammar: &Grammar) -> Result<Expr, ParseError> {
    let op = Op::Lit(value);
    match grammar.find_rule(ty, &op) {
        Some(id) => Ok(Expr::new(id, op, Vec::new())),
        None => Err(ParseError::UnexpectedType {
            symbol: format!("{}", op),
            expected: ty,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINARY: &str = "# binary digits\n\
                          Seq: \"1\" @ 6.0;\n\
                          Seq: \"0\" @ 6.0;\n\
                          # operators\n\
                          Seq: repeat_(Seq, Count) @ 1.0;\n\
                          Seq: concat_(Seq, Seq) @ 1.0;\n\
                          Seq: bflip_(Seq) @ 1.0;\n\
                          Seq: rev_(Seq) @ 1.0;\n\
                          Count: 0 @ 10.0;\n\
                          Count: 3 @ 0.625;\n";

    #[test]
    fn a_grammar_parses_with_comments_and_whitespace() {
        let grammar = parse_grammar(BINARY).expect("parsed grammar");
        assert_eq!(grammar.start(), Ty::Seq);
        assert_eq!(grammar.rules().count(), 8);
        let seq_total: f64 = grammar
            .rules_for(Ty::Seq)
            .map(|(id, _)| grammar.normalized_probability(id))
            .sum();
        assert!((seq_total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn the_grammar_display_round_trips() {
        let grammar = parse_grammar(BINARY).expect("parsed grammar");
        let reparsed = parse_grammar(&format!("{}", grammar)).expect("reparsed grammar");
        assert_eq!(reparsed.rules().count(), grammar.rules().count());
        for ((a_id, a), (b_id, b)) in grammar.rules().zip(reparsed.rules()) {
            assert_eq!(a.op, b.op);
            assert_eq!(a.arg_types, b.arg_types);
            assert!(
                (grammar.normalized_probability(a_id) - reparsed.normalized_probability(b_id))
                    .abs()
                    < 1e-12
            );
        }
    }

    #[test]
    fn unknown_types_and_symbols_are_rejected() {
        assert_eq!(
            parse_grammar("Str: \"1\" @ 6.0;\n"),
            Err(ParseError::UnknownType("Str".to_string()))
        );
        assert_eq!(
            parse_grammar("Seq: shuffle_(Seq) @ 1.0;\n"),
            Err(ParseError::UnknownSymbol("shuffle_".to_string()))
        );
        assert_eq!(parse_grammar("Seq \"1\" 6.0;\n"), Err(ParseError::Syntax));
        assert_eq!(parse_grammar(""), Err(ParseError::Syntax));
    }

    #[test]
    fn grammar_validation_failures_surface() {
        match parse_grammar("Seq: \"1\" @ -2.0;\n") {
            Err(ParseError::Grammar(GrammarError::NonPositiveWeight { weight, .. })) => {
                assert_eq!(weight, -2.0)
            }
            other => panic!("expected NonPositiveWeight, got {:?}", other),
        }
        assert_eq!(
            parse_grammar("Seq: repeat_(Seq, Count) @ 1.0;\nSeq: \"1\" @ 6.0;\n"),
            Err(ParseError::Grammar(GrammarError::UnproducibleType(
                Ty::Count
            )))
        );
        match parse_grammar("Seq: \"1\" @ 6.0;\nSeq: bflip_(Seq, Seq) @ 1.0;\n") {
            Err(ParseError::Grammar(GrammarError::OperatorArity { expected, found, .. })) => {
                assert_eq!((expected, found), (1, 2))
            }
            other => panic!("expected OperatorArity, got {:?}", other),
        }
    }

    #[test]
    fn expressions_resolve_with_type_and_arity_checks() {
        let grammar = parse_grammar(BINARY).expect("parsed grammar");
        let expr = parse_expr("concat_(repeat_(\"1\", 3), \"0\")", &grammar).expect("parsed");
        assert_eq!(format!("{}", expr), "concat_(repeat_(\"1\", 3), \"0\")");

        assert_eq!(
            parse_expr("repeat_(\"1\", \"0\")", &grammar),
            Err(ParseError::UnexpectedType {
                symbol: "\"0\"".to_string(),
                expected: Ty::Count,
            })
        );
        assert_eq!(
            parse_expr("rev_(\"1\", \"0\")", &grammar),
            Err(ParseError::ArityMismatch {
                symbol: "rev_".to_string(),
                expected: 1,
                found: 2,
            })
        );
        assert_eq!(
            parse_expr("shuffle_(\"1\")", &grammar),
            Err(ParseError::UnknownSymbol("shuffle_".to_string()))
        );
        assert_eq!(parse_expr("", &grammar), Err(ParseError::Syntax));
    }

    #[test]
    fn count_literals_resolve_only_where_expected() {
        let grammar = parse_grammar(BINARY).expect("parsed grammar");
        assert_eq!(
            parse_expr("3", &grammar),
            Err(ParseError::UnexpectedType {
                symbol: "3".to_string(),
                expected: Ty::Seq,
            })
        );
        let expr = parse_expr("repeat_(\"0\", 3)", &grammar).expect("parsed");
        assert_eq!(expr.size(), 3);
    }
}
