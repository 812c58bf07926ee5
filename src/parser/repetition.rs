//! Repetition and operator chaining.
//!
//! All of these run on an explicit work stack instead of recursing once per
//! repetition, so their native stack depth does not grow with the input.
//! A repetition is greedy: it yields only the accumulators of branches that
//! cannot be extended any further, in depth-first order.

use std::rc::Rc;

use super::combinators::{BoxedParser, Parser, Results, fail, position};
use super::state::{Cursor, Parsed};

/// Combines two operands; `None` rejects the application.
pub type BinaryFn<T> = Rc<dyn Fn(T, T) -> Option<T>>;

/// Extends an operand; `None` rejects the application.
pub type UnaryFn<T> = Rc<dyn Fn(T) -> Option<T>>;

enum Fold<A, T> {
    /// Always extends; the accumulator is handed over without a copy.
    Total(Rc<dyn Fn(A, T) -> A>),
    /// May reject; the accumulator is copied so a rejected branch can
    /// still yield it.
    Partial(Rc<dyn Fn(A, T) -> Option<A>>),
}

impl<A, T> Clone for Fold<A, T> {
    fn clone(&self) -> Self {
        match self {
            Fold::Total(f) => Fold::Total(Rc::clone(f)),
            Fold::Partial(f) => Fold::Partial(Rc::clone(f)),
        }
    }
}

struct Frame<A, S> {
    cursor: Cursor<S>,
    acc: A,
    count: usize,
}

struct Repeat<T, A, S> {
    parser: BoxedParser<T, S>,
    fold: Fold<A, T>,
    min: usize,
    max: Option<usize>,
    stack: Vec<Frame<A, S>>,
}

impl<T, A, S> Iterator for Repeat<T, A, S>
where
    T: 'static,
    A: Clone,
    S: Clone + 'static,
{
    type Item = Parsed<A, S>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            if self.max == Some(frame.count) {
                return Some(Parsed::new(frame.acc, frame.cursor));
            }

            let offset = frame.cursor.offset();
            // A step that consumes nothing would repeat forever.
            let steps: Vec<Parsed<T, S>> = self
                .parser
                .parse(frame.cursor.clone())
                .filter(|step| step.tail.offset() > offset)
                .collect();

            let last = steps.len().saturating_sub(1);
            let mut acc = Some(frame.acc);
            let mut children = Vec::with_capacity(steps.len());
            for (i, Parsed { value, tail }) in steps.into_iter().enumerate() {
                let folded = match &self.fold {
                    Fold::Total(f) => {
                        let base = if i == last { acc.take() } else { acc.clone() };
                        base.map(|base| f(base, value))
                    }
                    Fold::Partial(f) => acc.clone().and_then(|base| f(base, value)),
                };
                if let Some(folded) = folded {
                    children.push(Frame {
                        cursor: tail,
                        acc: folded,
                        count: frame.count + 1,
                    });
                }
            }

            if children.is_empty() {
                // Terminal: nothing admissible extends this branch.
                if let Some(acc) = acc {
                    if frame.count >= self.min {
                        return Some(Parsed::new(acc, frame.cursor));
                    }
                }
                continue;
            }

            self.stack.extend(children.into_iter().rev());
        }
        None
    }
}

fn repetition<T, A, S>(
    parser: BoxedParser<T, S>,
    min: usize,
    max: Option<usize>,
    seed: A,
    fold: Fold<A, T>,
) -> BoxedParser<A, S>
where
    T: 'static,
    A: Clone + 'static,
    S: Clone + 'static,
{
    BoxedParser::new(move |input: Cursor<S>| -> Results<A, S> {
        Box::new(Repeat {
            parser: parser.clone(),
            fold: fold.clone(),
            min,
            max,
            stack: vec![Frame {
                cursor: input,
                acc: seed.clone(),
                count: 0,
            }],
        })
    })
}

/// Repeats `parser` between `min` and `max` times, folding each value
/// into the accumulator. A fold returning `None` rejects that repetition.
pub fn repeat<T, A, S, F>(
    parser: BoxedParser<T, S>,
    min: usize,
    max: Option<usize>,
    seed: A,
    fold: F,
) -> BoxedParser<A, S>
where
    T: 'static,
    A: Clone + 'static,
    S: Clone + 'static,
    F: Fn(A, T) -> Option<A> + 'static,
{
    repetition(parser, min, max, seed, Fold::Partial(Rc::new(fold)))
}

fn push<T>(mut values: Vec<T>, value: T) -> Vec<T> {
    values.push(value);
    values
}

fn append<H, L>((head, links): (H, Vec<L>), link: L) -> (H, Vec<L>) {
    (head, push(links, link))
}

/// Zero or more.
pub fn many<T: Clone + 'static, S: Clone + 'static>(
    parser: BoxedParser<T, S>,
) -> BoxedParser<Vec<T>, S> {
    repetition(parser, 0, None, Vec::new(), Fold::Total(Rc::new(push)))
}

/// One or more.
pub fn many1<T: Clone + 'static, S: Clone + 'static>(
    parser: BoxedParser<T, S>,
) -> BoxedParser<Vec<T>, S> {
    repetition(parser, 1, None, Vec::new(), Fold::Total(Rc::new(push)))
}

/// Zero or more, folded.
pub fn many_fold<T, A, S, F>(parser: BoxedParser<T, S>, seed: A, fold: F) -> BoxedParser<A, S>
where
    T: 'static,
    A: Clone + 'static,
    S: Clone + 'static,
    F: Fn(A, T) -> A + 'static,
{
    repetition(parser, 0, None, seed, Fold::Total(Rc::new(fold)))
}

fn separated<T, U, A, S>(
    parser: BoxedParser<T, S>,
    separator: BoxedParser<U, S>,
    seed: A,
    fold: Fold<A, T>,
) -> BoxedParser<A, S>
where
    T: 'static,
    U: 'static,
    A: Clone + 'static,
    S: Clone + 'static,
{
    let rest = separator * parser.clone();
    parser.bind(move |first| {
        let acc = match &fold {
            Fold::Total(f) => Some(f(seed.clone(), first)),
            Fold::Partial(f) => f(seed.clone(), first),
        };
        match acc {
            Some(acc) => repetition(rest.clone(), 0, None, acc, fold.clone()),
            None => fail(),
        }
    })
}

/// One or more `parser` separated by `separator`, folded. A fold
/// returning `None` rejects that element.
pub fn separated_by_fold<T, U, A, S, F>(
    parser: BoxedParser<T, S>,
    separator: BoxedParser<U, S>,
    seed: A,
    fold: F,
) -> BoxedParser<A, S>
where
    T: 'static,
    U: 'static,
    A: Clone + 'static,
    S: Clone + 'static,
    F: Fn(A, T) -> Option<A> + 'static,
{
    separated(parser, separator, seed, Fold::Partial(Rc::new(fold)))
}

/// One or more `parser` separated by `separator`.
pub fn separated_by<T, U, S>(
    parser: BoxedParser<T, S>,
    separator: BoxedParser<U, S>,
) -> BoxedParser<Vec<T>, S>
where
    T: Clone + 'static,
    U: 'static,
    S: Clone + 'static,
{
    separated(parser, separator, Vec::new(), Fold::Total(Rc::new(push)))
}

/// `operand (op operand)*`, applied left to right.
///
/// An operator function returning `None` stops the chain before that
/// operator.
pub fn chain_left<T, S>(
    operand: BoxedParser<T, S>,
    operator: BoxedParser<BinaryFn<T>, S>,
) -> BoxedParser<T, S>
where
    T: Clone + 'static,
    S: Clone + 'static,
{
    let rest = operator + operand.clone();
    operand.bind(move |first| {
        repeat(rest.clone(), 0, None, first, |acc, (apply, right)| apply(acc, right))
    })
}

/// Like [`chain_left`], but yields `default` where no operand matches.
pub fn chain_left_or<T, S>(
    operand: BoxedParser<T, S>,
    operator: BoxedParser<BinaryFn<T>, S>,
    default: T,
) -> BoxedParser<T, S>
where
    T: Clone + 'static,
    S: Clone + 'static,
{
    chain_left(operand, operator) | super::combinators::pure(default)
}

/// `operand (op operand)*`, applied right to left.
///
/// The whole chain is collected first and folded from the right. If an
/// application is rejected, the chain is cut back to the longest prefix
/// that folds.
pub fn chain_right<T, S>(
    operand: BoxedParser<T, S>,
    operator: BoxedParser<BinaryFn<T>, S>,
) -> BoxedParser<T, S>
where
    T: Clone + 'static,
    S: Clone + 'static,
{
    type Link<T, S> = (BinaryFn<T>, T, Cursor<S>);

    let link = (operator + operand.clone() + position())
        .map(|((apply, value), tail)| (apply, value, tail));
    let links = (operand + position()).bind(move |head| {
        repetition(
            link.clone(),
            0,
            None,
            (head, Vec::<Link<T, S>>::new()),
            Fold::Total(Rc::new(append)),
        )
    });

    BoxedParser::new(move |input: Cursor<S>| -> Results<T, S> {
        Box::new(
            links
                .parse(input)
                .map(|Parsed { value: (head, links), tail }| fold_right(head, links, tail)),
        )
    })
}

fn fold_right<T: Clone, S: Clone>(
    (first, first_tail): (T, Cursor<S>),
    mut links: Vec<(BinaryFn<T>, T, Cursor<S>)>,
    tail: Cursor<S>,
) -> Parsed<T, S> {
    let mut tail = tail;
    loop {
        let Some((_, last, _)) = links.last() else {
            return Parsed::new(first, first_tail);
        };

        // Fold `a op1 b op2 c` as `a op1 (b op2 c)`.
        let folded = (0..links.len()).rev().try_fold(last.clone(), |right, i| {
            let left = if i == 0 {
                first.clone()
            } else {
                links[i - 1].1.clone()
            };
            (links[i].0)(left, right)
        });
        if let Some(value) = folded {
            return Parsed::new(value, tail);
        }

        links.pop();
        if let Some((_, _, cursor)) = links.last() {
            tail = cursor.clone();
        }
    }
}

/// `operand suffix*`, each suffix applied to the value so far.
pub fn postfix<T, S>(
    operand: BoxedParser<T, S>,
    suffix: BoxedParser<UnaryFn<T>, S>,
) -> BoxedParser<T, S>
where
    T: Clone + 'static,
    S: Clone + 'static,
{
    operand.bind(move |first| repeat(suffix.clone(), 0, None, first, |acc, apply| apply(acc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::combinators::{character, literal, satisfy};

    fn all<T: 'static>(parser: &BoxedParser<T>, text: &str) -> Vec<(T, usize)> {
        parser
            .parse(Cursor::new(text, ()))
            .map(|p| (p.value, p.tail.offset()))
            .collect()
    }

    fn number() -> BoxedParser<i64> {
        satisfy(|c| c.is_ascii_digit()).map(|c| i64::from(c.to_digit(10).unwrap_or(0)))
    }

    fn op(symbol: char, f: fn(i64, i64) -> Option<i64>) -> BoxedParser<BinaryFn<i64>> {
        character(symbol).map(move |_| -> BinaryFn<i64> { Rc::new(f) })
    }

    #[test]
    fn test_many_is_greedy() {
        let p = many(character('a'));
        assert_eq!(all(&p, "aaab"), vec![(vec!['a', 'a', 'a'], 3)]);
        assert_eq!(all(&p, "b"), vec![(vec![], 0)]);
    }

    #[test]
    fn test_many1_needs_one() {
        let p = many1(character('a'));
        assert!(all(&p, "b").is_empty());
    }

    #[test]
    fn test_bounded_repeat_leaves_tail() {
        let p = repeat(character('a'), 0, Some(1), 0, |n, _| Some(n + 1));
        assert_eq!(all(&p, "aaa"), vec![(1, 1)]);

        let p = repeat(character('a'), 2, Some(3), 0, |n, _| Some(n + 1));
        assert!(all(&p, "a").is_empty());
        assert_eq!(all(&p, "aaaa"), vec![(3, 3)]);
    }

    #[test]
    fn test_many_over_long_input() {
        let text = "x".repeat(10_000);
        let results = all(&many(character('x')), &text);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.len(), 10_000);
        assert_eq!(results[0].1, 10_000);
    }

    #[test]
    fn test_repeat_explores_every_branch() {
        let step = literal("a").concat(literal("ab"));
        let p = many(step);
        let results: Vec<_> = all(&p, "ab").into_iter().map(|(v, n)| (v.len(), n)).collect();
        // "a" then stuck on "b"; "ab" then end
        assert_eq!(results, vec![(1, 1), (1, 2)]);
    }

    #[test]
    fn test_rejected_fold_stops_repetition() {
        let p = repeat(number(), 0, None, 0, |sum, n| (sum + n <= 5).then_some(sum + n));
        assert_eq!(all(&p, "2238"), vec![(4, 2)]);
    }

    #[test]
    fn test_separated_by_fold_sums() {
        let p = separated_by_fold(number(), character(','), 0, |sum, n| Some(sum + n));
        assert_eq!(all(&p, "1,2,3,4,5,6,7"), vec![(28, 13)]);
    }

    #[test]
    fn test_separated_by_keeps_trailing_separator() {
        let p = separated_by(number(), character(','));
        assert_eq!(all(&p, "1,2,"), vec![(vec![1, 2], 3)]);
    }

    #[test]
    fn test_chain_left_associates_left() {
        let ops = op('+', |a, b| Some(a * 10 + b)) | op('-', |a, b| Some(a * 100 + b));
        let p = chain_left(number(), ops);
        // ((1 + 2) - 3) = (12) - 3 = 1203
        assert_eq!(all(&p, "1+2-3"), vec![(1203, 5)]);
    }

    #[test]
    fn test_chain_left_or_default() {
        let p = chain_left_or(number(), op('+', |a, b| Some(a + b)), -1);
        assert_eq!(all(&p, "x"), vec![(-1, 0)]);
    }

    #[test]
    fn test_chain_right_associates_right() {
        let p = chain_right(number(), op('^', |a, b| a.checked_pow(u32::try_from(b).ok()?)));
        // 2^(3^2) = 512, not (2^3)^2 = 64
        assert_eq!(all(&p, "2^3^2"), vec![(512, 5)]);
    }

    #[test]
    fn test_chain_right_truncates_on_rejection() {
        let p = chain_right(number(), op('-', |a, b| (a > b).then_some(a - b)));
        // 9-(5-7) is rejected at 5-7, so the chain stops at 9-5
        assert_eq!(all(&p, "9-5-7"), vec![(4, 3)]);
    }

    #[test]
    fn test_chain_stops_at_rejected_operator() {
        let p = chain_left(number(), op('/', |a, b| a.checked_div(b)));
        assert_eq!(all(&p, "8/0"), vec![(8, 1)]);
    }

    #[test]
    fn test_postfix() {
        let bang = character('!').map(|_| -> UnaryFn<i64> { Rc::new(|n| Some(n * 2)) });
        let p = postfix(number(), bang);
        assert_eq!(all(&p, "3!!"), vec![(12, 3)]);
    }
}
