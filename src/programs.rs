//! This module embeds a small catalog of ready-to-run machines in the encoded
//! table format. They double as documentation of the format and as fixtures
//! for the simulator and compiler tests.

use crate::parser::parse;
use crate::transitions::TransitionTable;
use crate::types::MachineError;

/// A named, embedded machine in the encoded table format.
pub struct MachineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

lazy_static::lazy_static! {
    /// The embedded machine catalog.
    pub static ref MACHINES: Vec<MachineInfo> = vec![
        MachineInfo {
            name: "unary-counter",
            description: "halts with one 1 per input symbol",
            source: include_str!("../machines/unary-counter.tm"),
        },
        MachineInfo {
            name: "equal-counts",
            description: "accepts 0^n 1^n 0^n",
            source: include_str!("../machines/equal-counts.tm"),
        },
        MachineInfo {
            name: "binary-add",
            description: "reads x$y and halts with x+y in binary on the last tape",
            source: include_str!("../machines/binary-add.tm"),
        },
        MachineInfo {
            name: "copy",
            description: "halts with the input copied onto the output tape",
            source: include_str!("../machines/copy.tm"),
        },
        MachineInfo {
            name: "xor",
            description: "reads x$y and halts with the bitwise xor on the last tape",
            source: include_str!("../machines/xor.tm"),
        },
        MachineInfo {
            name: "palindrome",
            description: "accepts binary palindromes",
            source: include_str!("../machines/palindrome.tm"),
        },
    ];
}

/// The names of all embedded machines, in catalog order.
pub fn names() -> Vec<&'static str> {
    MACHINES.iter().map(|info| info.name).collect()
}

/// Parses the embedded machine with the given name.
pub fn catalog(name: &str) -> Result<TransitionTable, MachineError> {
    let info = MACHINES
        .iter()
        .find(|info| info.name == name)
        .ok_or_else(|| MachineError::Validation(format!("no embedded machine named {name:?}")))?;
    parse(info.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::TuringMachine;
    use crate::tape::SingleTape;
    use crate::types::EndState;

    #[test]
    fn test_catalog_contents() {
        assert_eq!(
            names(),
            [
                "unary-counter",
                "equal-counts",
                "binary-add",
                "copy",
                "xor",
                "palindrome"
            ]
        );
        assert!(catalog("no-such-machine").is_err());
    }

    #[test]
    fn test_all_machines_parse() {
        for info in MACHINES.iter() {
            let table = catalog(info.name).unwrap();
            assert!(table.n_tapes() >= 1, "{} has no tapes", info.name);
            assert!(!table.is_empty(), "{} has no transitions", info.name);
        }
    }

    #[test]
    fn test_unary_counter_scenario() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("unary-counter").unwrap());
        assert_eq!(machine.run("010010").unwrap(), EndState::Halt);
        assert_eq!(machine.output(), Some("111111".to_string()));
        assert_eq!(machine.time(), 7);
    }

    #[test]
    fn test_equal_counts_scenario() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("equal-counts").unwrap());
        for input in ["", "010", "001100"] {
            assert!(machine.accepts(input).unwrap(), "{input:?} not accepted");
        }
        for input in ["0100", "0010", "0110", "10"] {
            assert!(machine.rejects(input).unwrap(), "{input:?} not rejected");
        }
    }

    #[test]
    fn test_equal_counts_family() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("equal-counts").unwrap());
        for n in 0..8 {
            let word = format!("{}{}{}", "0".repeat(n), "1".repeat(n), "0".repeat(n));
            assert!(machine.accepts(&word).unwrap(), "{word:?} not accepted");

            // one block off by one in every position
            for (zeros_a, ones, zeros_b) in [(n + 1, n, n), (n, n + 1, n), (n, n, n + 1)] {
                let word = format!(
                    "{}{}{}",
                    "0".repeat(zeros_a),
                    "1".repeat(ones),
                    "0".repeat(zeros_b)
                );
                assert!(machine.rejects(&word).unwrap(), "{word:?} not rejected");
            }
        }
    }

    #[test]
    fn test_binary_add_scenario() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("binary-add").unwrap());
        for (input, sum) in [
            ("0$0", "0"),
            ("1$1", "10"),
            ("11$1", "100"),
            ("111$1", "1000"),
        ] {
            assert_eq!(machine.result(input).unwrap(), sum, "on {input:?}");
        }
    }

    #[test]
    fn test_binary_add_exhaustive_small() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("binary-add").unwrap());
        for x in 0u32..16 {
            for y in 0u32..16 {
                let input = format!("{x:b}${y:b}");
                let expected = format!("{:b}", x + y);
                assert_eq!(machine.result(&input).unwrap(), expected, "on {input:?}");
            }
        }
    }

    #[test]
    fn test_xor_scenario() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("xor").unwrap());
        assert_eq!(machine.result("0100$1101").unwrap(), "1001");
        assert_eq!(machine.result("0$0").unwrap(), "0");
        assert_eq!(machine.result("1$1").unwrap(), "0");
        assert_eq!(machine.result("10$01").unwrap(), "11");
    }

    #[test]
    fn test_xor_exhaustive_small() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("xor").unwrap());
        for length in 1..=4u32 {
            for x in 0..1u32 << length {
                for y in 0..1u32 << length {
                    let input = format!("{x:0w$b}${y:0w$b}", w = length as usize);
                    let expected = format!("{:0w$b}", x ^ y, w = length as usize);
                    assert_eq!(machine.result(&input).unwrap(), expected, "on {input:?}");
                }
            }
        }
    }

    #[test]
    fn test_palindrome_scenario() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("palindrome").unwrap());
        for input in ["", "0", "1", "00", "010", "1001", "10101"] {
            assert!(machine.accepts(input).unwrap(), "{input:?} not accepted");
        }
        for input in ["10", "01", "100", "0011", "10110"] {
            assert!(machine.rejects(input).unwrap(), "{input:?} not rejected");
        }
    }

    #[test]
    fn test_palindrome_all_words_up_to_eight() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("palindrome").unwrap());
        for length in 0..=8u32 {
            for bits in 0..1u32 << length {
                let word: String = (0..length)
                    .map(|i| if bits >> i & 1 == 1 { '1' } else { '0' })
                    .collect();
                let mirrored: String = word.chars().rev().collect();
                assert_eq!(
                    machine.accepts(&word).unwrap(),
                    word == mirrored,
                    "wrong verdict on {word:?}"
                );
            }
        }
    }

    #[test]
    fn test_copy_scenario_all_words_up_to_ten() {
        let mut machine = TuringMachine::<SingleTape>::new(catalog("copy").unwrap());
        for length in 0..=10u32 {
            for bits in 0..1u32 << length {
                let word: String = (0..length)
                    .map(|i| if bits >> i & 1 == 1 { '1' } else { '0' })
                    .collect();
                assert_eq!(machine.result(&word).unwrap(), word);
            }
        }
    }
}
