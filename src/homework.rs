use {
    crate::{number::SnailfishNumber, util::Parse},
    derive_deref::Deref,
    nom::{
        character::complete::{line_ending, multispace0},
        combinator::{all_consuming, opt},
        error::Error,
        multi::many0,
        sequence::terminated,
        Err, IResult,
    },
    rayon::iter::{IntoParallelIterator, ParallelIterator},
    std::ops::Add,
};

/// An ordered collection of snailfish numbers, one per input line
#[derive(Debug, Default, Deref, PartialEq)]
pub struct Homework(Vec<SnailfishNumber>);

impl Homework {
    /// Folds the whole collection into a single number with left-to-right addition
    ///
    /// The stored numbers are never mutated; each addition operates on clones. An empty collection
    /// sums to the empty number.
    pub fn sum(&self) -> SnailfishNumber {
        self.0
            .iter()
            .cloned()
            .fold(SnailfishNumber::default(), Add::add)
    }

    pub fn magnitude_of_sum(&self) -> Option<u64> {
        (!self.0.is_empty()).then(|| self.sum().magnitude())
    }

    /// Finds the largest magnitude obtainable by adding any two distinct numbers
    ///
    /// Both orders of every pair are considered, since addition is not commutative. `None` means
    /// the collection holds fewer than two numbers, which leaves no pair to sum.
    pub fn try_max_pairwise_magnitude(&self) -> Option<u64> {
        (0_usize..self.0.len())
            .into_par_iter()
            .flat_map_iter(|left_index: usize| {
                (0_usize..self.0.len())
                    .map(move |right_index: usize| (left_index, right_index))
            })
            .filter(|(left_index, right_index)| left_index != right_index)
            .map(|(left_index, right_index)| {
                (self.0[left_index].clone() + self.0[right_index].clone()).magnitude()
            })
            .max()
    }
}

impl Parse for Homework {
    fn parse<'i>(input: &'i str) -> IResult<&'i str, Self> {
        let (input, numbers): (&str, Vec<SnailfishNumber>) = many0(terminated(
            SnailfishNumber::parse,
            opt(line_ending),
        ))(input)?;

        Ok((input, Self(numbers)))
    }
}

impl<'i> TryFrom<&'i str> for Homework {
    type Error = Err<Error<&'i str>>;

    fn try_from(input: &'i str) -> Result<Self, Self::Error> {
        // Trailing blank lines end the collection rather than failing it
        Ok(all_consuming(terminated(Self::parse, multispace0))(input)?.1)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::OnceLock};

    const HOMEWORK_STR: &str = "\
        [[[0,[5,8]],[[1,7],[9,6]]],[[4,[1,2]],[[1,4],2]]]\n\
        [[[5,[2,8]],4],[5,[[9,9],0]]]\n\
        [6,[[[6,2],[5,6]],[[7,6],[4,7]]]]\n\
        [[[6,[0,7]],[0,9]],[4,[9,[9,0]]]]\n\
        [[[7,[6,4]],[3,[1,3]]],[[[5,5],1],9]]\n\
        [[6,[[7,3],[3,2]]],[[[3,8],[5,7]],4]]\n\
        [[[[5,4],[7,7]],8],[[8,3],8]]\n\
        [[9,3],[[9,9],[6,[4,9]]]]\n\
        [[2,[[7,7],7]],[[5,8],[[9,3],[0,2]]]]\n\
        [[[[5,2],5],[8,[3,7]]],[[5,[7,5]],[4,4]]]\n";

    fn homework() -> &'static Homework {
        static ONCE_LOCK: OnceLock<Homework> = OnceLock::new();

        ONCE_LOCK.get_or_init(|| HOMEWORK_STR.try_into().unwrap())
    }

    fn number(input: &str) -> SnailfishNumber {
        input.try_into().unwrap()
    }

    #[test]
    fn test_homework_try_from_str() {
        assert_eq!(homework().len(), 10_usize);
        assert_eq!(homework()[0_usize], number("[[[0,[5,8]],[[1,7],[9,6]]],[[4,[1,2]],[[1,4],2]]]"));

        // Trailing blank lines are end of input, not an error
        let homework: Homework = "[1,1]\n[2,2]\n\n".try_into().unwrap();

        assert_eq!(homework.len(), 2_usize);
        assert_eq!(Homework::try_from("").unwrap().len(), 0_usize);
        assert!(Homework::try_from("[1,1]\n[2,2\n").is_err());
    }

    #[test]
    fn test_homework_sum() {
        for (homework_str, sum) in [
            ("[1,1]\n[2,2]\n[3,3]\n[4,4]\n", "[[[[1,1],[2,2]],[3,3]],[4,4]]"),
            (
                "[1,1]\n[2,2]\n[3,3]\n[4,4]\n[5,5]\n",
                "[[[[3,0],[5,3]],[4,4]],[5,5]]",
            ),
            (
                "[1,1]\n[2,2]\n[3,3]\n[4,4]\n[5,5]\n[6,6]\n",
                "[[[[5,0],[7,4]],[5,5]],[6,6]]",
            ),
        ] {
            let homework: Homework = homework_str.try_into().unwrap();

            assert_eq!(homework.sum(), number(sum));
        }

        assert_eq!(
            homework().sum(),
            number("[[[[6,6],[7,6]],[[7,7],[7,0]]],[[[7,7],[7,7]],[[7,8],[9,9]]]]")
        );
    }

    #[test]
    fn test_homework_magnitude_of_sum() {
        assert_eq!(homework().magnitude_of_sum(), Some(4140_u64));
        assert_eq!(Homework::default().magnitude_of_sum(), None);
    }

    #[test]
    fn test_homework_try_max_pairwise_magnitude() {
        assert_eq!(homework().try_max_pairwise_magnitude(), Some(3993_u64));
        assert_eq!(Homework::default().try_max_pairwise_magnitude(), None);
        assert_eq!(
            Homework::try_from("[1,1]\n")
                .unwrap()
                .try_max_pairwise_magnitude(),
            None
        );
    }
}
