use std::iter;
use std::ops::{Add, BitOr, Mul, Shr, Sub};
use std::rc::Rc;

use super::state::{Cursor, Parsed};

/// Lazily produced parses of one input.
pub type Results<T, S> = Box<dyn Iterator<Item = Parsed<T, S>>>;

pub trait Parser<T, S> {
    fn parse(&self, input: Cursor<S>) -> Results<T, S>;
}

// Allow closures to be parsers
impl<T, S, F: Fn(Cursor<S>) -> Results<T, S>> Parser<T, S> for F {
    fn parse(&self, input: Cursor<S>) -> Results<T, S> {
        self(input)
    }
}

type ParserFn<T, S> = Rc<dyn Fn(Cursor<S>) -> Results<T, S>>;

/// Runs `f` only once the returned iterator is first pulled.
fn lazily<T: 'static, S: 'static>(f: impl FnOnce() -> Results<T, S> + 'static) -> Results<T, S> {
    Box::new(iter::once_with(f).flatten())
}

fn single<T: 'static, S: 'static>(value: T, tail: Cursor<S>) -> Results<T, S> {
    Box::new(iter::once(Parsed::new(value, tail)))
}

fn none<T: 'static, S: 'static>() -> Results<T, S> {
    Box::new(iter::empty())
}

// === Boxed Parser for type erasure ===

pub struct BoxedParser<T, S = ()> {
    parser: ParserFn<T, S>,
}

impl<T, S> Clone for BoxedParser<T, S> {
    fn clone(&self) -> Self {
        BoxedParser {
            parser: Rc::clone(&self.parser),
        }
    }
}

impl<T: 'static, S: 'static> BoxedParser<T, S> {
    pub fn new<P: Parser<T, S> + 'static>(parser: P) -> Self {
        BoxedParser {
            parser: Rc::new(move |input| parser.parse(input)),
        }
    }
}

impl<T, S> Parser<T, S> for BoxedParser<T, S> {
    fn parse(&self, input: Cursor<S>) -> Results<T, S> {
        (self.parser)(input)
    }
}

// === Combinators as methods ===

impl<T: 'static, S: Clone + 'static> BoxedParser<T, S> {
    /// Runs `f` on every result, continuing from that result's tail.
    pub fn bind<U: 'static, F>(self, f: F) -> BoxedParser<U, S>
    where
        F: Fn(T) -> BoxedParser<U, S> + 'static,
    {
        let f = Rc::new(f);
        BoxedParser::new(move |input: Cursor<S>| -> Results<U, S> {
            let f = Rc::clone(&f);
            Box::new(
                self.parse(input)
                    .flat_map(move |Parsed { value, tail }| f(value).parse(tail)),
            )
        })
    }

    /// Sequence: parse self then other, return (T, U)
    pub fn seq<U: 'static>(self, other: BoxedParser<U, S>) -> BoxedParser<(T, U), S>
    where
        T: Clone,
    {
        self.bind(move |a| other.clone().map(move |b| (a.clone(), b)))
    }

    /// Keep left: parse self then other, discard other's result
    pub fn skip<U: 'static>(self, other: BoxedParser<U, S>) -> BoxedParser<T, S>
    where
        T: Clone,
    {
        self.bind(move |a| other.clone().map(move |_| a.clone()))
    }

    /// Keep right: parse self then other, discard self's result
    pub fn skip_left<U: 'static>(self, other: BoxedParser<U, S>) -> BoxedParser<U, S> {
        self.bind(move |_| other.clone())
    }

    /// Map: transform result
    pub fn map<U: 'static, F: Fn(T) -> U + 'static>(self, f: F) -> BoxedParser<U, S> {
        let f = Rc::new(f);
        BoxedParser::new(move |input: Cursor<S>| -> Results<U, S> {
            let f = Rc::clone(&f);
            Box::new(
                self.parse(input)
                    .map(move |Parsed { value, tail }| Parsed::new(f(value), tail)),
            )
        })
    }

    /// Drops results whose value fails `predicate`.
    pub fn filter<F: Fn(&T) -> bool + 'static>(self, predicate: F) -> BoxedParser<T, S> {
        let predicate = Rc::new(predicate);
        BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
            let predicate = Rc::clone(&predicate);
            Box::new(self.parse(input).filter(move |parsed| predicate(&parsed.value)))
        })
    }

    /// Maps and drops results for which `f` returns `None`.
    pub fn filter_map<U: 'static, F>(self, f: F) -> BoxedParser<U, S>
    where
        F: Fn(T) -> Option<U> + 'static,
    {
        let f = Rc::new(f);
        BoxedParser::new(move |input: Cursor<S>| -> Results<U, S> {
            let f = Rc::clone(&f);
            Box::new(
                self.parse(input)
                    .filter_map(move |Parsed { value, tail }| Some(Parsed::new(f(value)?, tail))),
            )
        })
    }

    /// All results of self followed by all results of other, both on the same input.
    pub fn concat(self, other: BoxedParser<T, S>) -> BoxedParser<T, S> {
        BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
            let other = other.clone();
            let rest = input.clone();
            Box::new(self.parse(input).chain(lazily(move || other.parse(rest))))
        })
    }

    /// Commits to the first result.
    pub fn first(self) -> BoxedParser<T, S> {
        BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
            Box::new(self.parse(input).take(1))
        })
    }

    /// Choice: try self, if it yields nothing try other
    pub fn or(self, other: BoxedParser<T, S>) -> BoxedParser<T, S> {
        self.concat(other).first()
    }

    /// Keeps results whose value is not produced by `excluded` on the same input.
    pub fn except<U>(self, excluded: BoxedParser<U, S>) -> BoxedParser<T, S>
    where
        T: PartialEq<U>,
        U: 'static,
    {
        BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
            let this = self.clone();
            let excluded = excluded.clone();
            lazily(move || -> Results<T, S> {
                let forbidden: Vec<U> = excluded.parse(input.clone()).map(|r| r.value).collect();
                Box::new(
                    this.parse(input)
                        .filter(move |parsed| !forbidden.iter().any(|f| parsed.value == *f)),
                )
            })
        })
    }

    /// Keeps results after which `next` does not match.
    pub fn not_followed_by<U: 'static>(self, next: BoxedParser<U, S>) -> BoxedParser<T, S> {
        BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
            let next = next.clone();
            Box::new(
                self.parse(input)
                    .filter(move |parsed| next.parse(parsed.tail.clone()).next().is_none()),
            )
        })
    }
}

// === Operator Overloading ===

/// `+` for sequence: A + B -> (A, B)
impl<T: Clone + 'static, U: 'static, S: Clone + 'static> Add<BoxedParser<U, S>>
    for BoxedParser<T, S>
{
    type Output = BoxedParser<(T, U), S>;

    fn add(self, rhs: BoxedParser<U, S>) -> Self::Output {
        self.seq(rhs)
    }
}

/// `-` for keep left: A - B -> A (parse B, discard result)
impl<T: Clone + 'static, U: 'static, S: Clone + 'static> Sub<BoxedParser<U, S>>
    for BoxedParser<T, S>
{
    type Output = BoxedParser<T, S>;

    fn sub(self, rhs: BoxedParser<U, S>) -> Self::Output {
        self.skip(rhs)
    }
}

/// `*` for keep right: A * B -> B (parse A, discard result)
impl<T: 'static, U: 'static, S: Clone + 'static> Mul<BoxedParser<U, S>> for BoxedParser<T, S> {
    type Output = BoxedParser<U, S>;

    fn mul(self, rhs: BoxedParser<U, S>) -> Self::Output {
        self.skip_left(rhs)
    }
}

/// `|` for choice: A | B -> A or B
impl<T: 'static, S: Clone + 'static> BitOr<BoxedParser<T, S>> for BoxedParser<T, S> {
    type Output = BoxedParser<T, S>;

    fn bitor(self, rhs: BoxedParser<T, S>) -> Self::Output {
        self.or(rhs)
    }
}

/// `>>` for map: A >> fn -> B
impl<T: 'static, U: 'static, S: Clone + 'static, F: Fn(T) -> U + 'static> Shr<F>
    for BoxedParser<T, S>
{
    type Output = BoxedParser<U, S>;

    fn shr(self, f: F) -> Self::Output {
        self.map(f)
    }
}

// === Primitive Parsers ===

/// Succeeds with `value` without consuming input.
pub fn pure<T: Clone + 'static, S: 'static>(value: T) -> BoxedParser<T, S> {
    BoxedParser::new(move |input: Cursor<S>| single(value.clone(), input))
}

pub fn fail<T: 'static, S: 'static>() -> BoxedParser<T, S> {
    BoxedParser::new(|_: Cursor<S>| none())
}

/// Builds the parser from `factory` each time it is applied. Recursive
/// rules refer to each other through this.
pub fn defer<T: 'static, S: 'static, F>(factory: F) -> BoxedParser<T, S>
where
    F: Fn() -> BoxedParser<T, S> + 'static,
{
    BoxedParser::new(move |input: Cursor<S>| factory().parse(input))
}

/// One character satisfying `predicate`.
pub fn satisfy<S, F>(predicate: F) -> BoxedParser<char, S>
where
    S: Clone + 'static,
    F: Fn(char) -> bool + 'static,
{
    BoxedParser::new(move |input: Cursor<S>| -> Results<char, S> {
        match input.current() {
            Ok(c) if predicate(c) => single(c, input.skip(c.len_utf8())),
            _ => none(),
        }
    })
}

pub fn any_char<S: Clone + 'static>() -> BoxedParser<char, S> {
    satisfy(|_| true)
}

pub fn character<S: Clone + 'static>(expected: char) -> BoxedParser<char, S> {
    satisfy(move |c| c == expected)
}

/// The exact text `expected`.
pub fn literal<S: Clone + 'static>(expected: &'static str) -> BoxedParser<&'static str, S> {
    BoxedParser::new(move |input: Cursor<S>| -> Results<&'static str, S> {
        if input.rest().starts_with(expected) {
            single(expected, input.skip(expected.len()))
        } else {
            none()
        }
    })
}

/// `expected` ignoring ASCII case.
pub fn literal_ignore_case<S: Clone + 'static>(
    expected: &'static str,
) -> BoxedParser<&'static str, S> {
    BoxedParser::new(move |input: Cursor<S>| -> Results<&'static str, S> {
        let matches = input
            .rest()
            .get(..expected.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(expected));
        if matches {
            single(expected, input.skip(expected.len()))
        } else {
            none()
        }
    })
}

pub fn end_of_input<S: Clone + 'static>() -> BoxedParser<(), S> {
    BoxedParser::new(|input: Cursor<S>| -> Results<(), S> {
        if input.is_at_end() {
            single((), input)
        } else {
            none()
        }
    })
}

/// The current cursor, without consuming input.
pub fn position<S: Clone + 'static>() -> BoxedParser<Cursor<S>, S> {
    BoxedParser::new(|input: Cursor<S>| single(input.clone(), input))
}

// === State ===

/// The threaded state.
pub fn get_state<S: Clone + 'static>() -> BoxedParser<S, S> {
    BoxedParser::new(|input: Cursor<S>| single(input.state().clone(), input))
}

/// Replaces the threaded state.
pub fn set_state<S: Clone + 'static>(state: S) -> BoxedParser<(), S> {
    BoxedParser::new(move |input: Cursor<S>| single((), input.with_state(state.clone())))
}

/// Replaces the state with `f(state)`, or fails where `f` returns `None`.
pub fn update_state<S, F>(f: F) -> BoxedParser<(), S>
where
    S: Clone + 'static,
    F: Fn(&S) -> Option<S> + 'static,
{
    BoxedParser::new(move |input: Cursor<S>| -> Results<(), S> {
        match f(input.state()) {
            Some(state) => single((), input.with_state(state)),
            None => none(),
        }
    })
}

/// Runs `parser` with the state derived by `enter`, then puts the outer
/// state back on every result.
pub fn with_state<T, S, F>(enter: F, parser: BoxedParser<T, S>) -> BoxedParser<T, S>
where
    T: 'static,
    S: Clone + 'static,
    F: Fn(&S) -> S + 'static,
{
    BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
        let outer = input.state().clone();
        let inner = input.with_state(enter(input.state()));
        Box::new(
            parser
                .parse(inner)
                .map(move |Parsed { value, tail }| Parsed::new(value, tail.with_state(outer.clone()))),
        )
    })
}

// === Derived combinators ===

/// Optional: parse zero or one
pub fn optional<T: 'static, S: Clone + 'static>(
    parser: BoxedParser<T, S>,
) -> BoxedParser<Option<T>, S> {
    parser.map(Some).or(BoxedParser::new(|input: Cursor<S>| single(None, input)))
}

/// `open parser close`, keeping only the inner value.
pub fn bracketed_by<T, A, B, S>(
    parser: BoxedParser<T, S>,
    open: BoxedParser<A, S>,
    close: BoxedParser<B, S>,
) -> BoxedParser<T, S>
where
    T: Clone + 'static,
    A: 'static,
    B: 'static,
    S: Clone + 'static,
{
    open * parser - close
}

/// Ordered choice over `alternatives`.
pub fn one_of<T: 'static, S: Clone + 'static>(
    alternatives: Vec<BoxedParser<T, S>>,
) -> BoxedParser<T, S> {
    alternatives
        .into_iter()
        .reduce(BoxedParser::or)
        .unwrap_or_else(fail)
}

/// Every result of every alternative, in order.
pub fn all_of<T: 'static, S: Clone + 'static>(
    alternatives: Vec<BoxedParser<T, S>>,
) -> BoxedParser<T, S> {
    alternatives
        .into_iter()
        .reduce(BoxedParser::concat)
        .unwrap_or_else(fail)
}

/// Applies `parser` to `text` and returns the single parse.
///
/// Pulls at most two results: none is [`ParseError::NoMatch`], two is
/// [`ParseError::Ambiguous`]. The tail is returned unchanged; callers that
/// need the whole input consumed add [`end_of_input`].
pub fn parse<T, S>(
    parser: &BoxedParser<T, S>,
    text: &str,
    state: S,
) -> Result<Parsed<T, S>, super::state::ParseError>
where
    T: 'static,
    S: 'static,
{
    use super::state::ParseError;

    let mut results = parser.parse(Cursor::new(text, state));
    let first = results.next();
    let outcome = match (first, results.next()) {
        (None, _) => Err(ParseError::NoMatch),
        (Some(parsed), None) => Ok(parsed),
        (Some(_), Some(_)) => Err(ParseError::Ambiguous),
    };

    tracing::debug!(
        length = text.len(),
        outcome = match &outcome {
            Ok(_) => "matched",
            Err(ParseError::NoMatch) => "no match",
            Err(ParseError::Ambiguous) => "ambiguous",
        },
        "parse finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::state::ParseError;

    fn digit() -> BoxedParser<u32> {
        satisfy(|c| c.is_ascii_digit()).map(|c| c.to_digit(10).unwrap_or(0))
    }

    fn all<T: 'static>(parser: &BoxedParser<T>, text: &str) -> Vec<(T, usize)> {
        parser
            .parse(Cursor::new(text, ()))
            .map(|p| (p.value, p.tail.offset()))
            .collect()
    }

    #[test]
    fn test_pure_does_not_consume() {
        assert_eq!(all(&pure(7), "abc"), vec![(7, 0)]);
    }

    #[test]
    fn test_fail_yields_nothing() {
        assert!(all(&fail::<(), ()>(), "abc").is_empty());
    }

    #[test]
    fn test_sequence_operators() {
        let pair = digit() + digit();
        assert_eq!(all(&pair, "12x"), vec![((1, 2), 2)]);

        let left = digit() - character(',');
        assert_eq!(all(&left, "3,"), vec![(3, 2)]);

        let right = character('-') * digit();
        assert_eq!(all(&right, "-4"), vec![(4, 2)]);

        let mapped = digit() >> |d| d * 10;
        assert_eq!(all(&mapped, "5"), vec![(50, 1)]);
    }

    #[test]
    fn test_concat_keeps_both() {
        let p = literal("a").concat(literal("ab").map(|_| "ab!"));
        assert_eq!(all(&p, "ab"), vec![("a", 1), ("ab!", 2)]);
    }

    #[test]
    fn test_or_prefers_left() {
        let p = literal("true").map(|_| 1) | literal("true").map(|_| 2);
        assert_eq!(all(&p, "true"), vec![(1, 4)]);

        let p = literal("x").map(|_| 1) | literal("true").map(|_| 2);
        assert_eq!(all(&p, "true"), vec![(2, 4)]);
    }

    #[test]
    fn test_or_never_runs_right_after_success() {
        let right = BoxedParser::new(|_: Cursor<()>| -> Results<i32, ()> {
            panic!("right alternative evaluated")
        });
        let p = pure(1) | right;
        assert_eq!(all(&p, ""), vec![(1, 0)]);
    }

    #[test]
    fn test_defer_is_lazy() {
        let p: BoxedParser<i32> = defer(|| panic!("built too early"));
        let _q = p.clone() | pure(1);
    }

    #[test]
    fn test_filter_and_filter_map() {
        let even = digit().filter(|d| d % 2 == 0);
        assert!(all(&even, "3").is_empty());
        assert_eq!(all(&even, "4"), vec![(4, 1)]);

        let halved = digit().filter_map(|d| (d % 2 == 0).then_some(d / 2));
        assert_eq!(all(&halved, "8"), vec![(4, 1)]);
    }

    #[test]
    fn test_except_compares_values() {
        let word = satisfy(|c: char| c.is_ascii_alphabetic()).map(String::from);
        let p = word.except(literal("x").map(String::from));
        assert!(all(&p, "x").is_empty());
        assert_eq!(all(&p, "y"), vec![("y".to_string(), 1)]);
    }

    #[test]
    fn test_not_followed_by() {
        let p = literal("=").not_followed_by(literal("="));
        assert_eq!(all(&p, "=1"), vec![("=", 1)]);
        assert!(all(&p, "==").is_empty());
    }

    #[test]
    fn test_optional() {
        let p = optional(digit());
        assert_eq!(all(&p, "7"), vec![(Some(7), 1)]);
        assert_eq!(all(&p, "x"), vec![(None, 0)]);
    }

    #[test]
    fn test_bracketed_by() {
        let p = bracketed_by(digit(), character('('), character(')'));
        assert_eq!(all(&p, "(9)"), vec![(9, 3)]);
        assert!(all(&p, "(9").is_empty());
    }

    #[test]
    fn test_literal_ignore_case() {
        let p = literal_ignore_case("ul");
        assert_eq!(all(&p, "Ul"), vec![("ul", 2)]);
        assert!(all(&p, "u").is_empty());
    }

    #[test]
    fn test_state_is_restored_after_with_state() {
        let inner = get_state::<i32>();
        let p = with_state(|s| s + 1, inner) + get_state();
        let results: Vec<_> = p
            .parse(Cursor::new("", 10))
            .map(|parsed| parsed.value)
            .collect();
        assert_eq!(results, vec![(11, 10)]);
    }

    #[test]
    fn test_update_state_can_fail() {
        let p = update_state(|s: &i32| (*s > 0).then_some(s - 1));
        assert_eq!(p.parse(Cursor::new("", 1)).count(), 1);
        assert_eq!(p.parse(Cursor::new("", 0)).count(), 0);
    }

    #[test]
    fn test_parse_outcomes() {
        let p = literal::<()>("a");
        assert_eq!(parse(&p, "a", ()).map(|r| r.value), Ok("a"));
        assert_eq!(parse(&p, "b", ()).map(|r| r.value), Err(ParseError::NoMatch));

        let both = literal::<()>("a").concat(literal("a"));
        assert_eq!(
            parse(&both, "a", ()).map(|r| r.value),
            Err(ParseError::Ambiguous)
        );
    }

    #[test]
    fn test_parse_returns_tail() {
        let p = literal::<()>("ab");
        let parsed = parse(&p, "abc", ()).unwrap();
        assert_eq!(parsed.tail.rest(), "c");
    }
}
