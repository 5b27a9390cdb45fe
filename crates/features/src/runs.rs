//! Run-length grouping of consecutive qualifying bars.

use std::ops::Range;

/// Index ranges of every maximal run of `true` values, in order.
pub fn true_runs(mask: &[bool]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &flag) in mask.iter().enumerate() {
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..mask.len());
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_runs() {
        assert!(true_runs(&[]).is_empty());
        assert!(true_runs(&[false, false]).is_empty());
    }

    #[test]
    fn test_runs_split_on_false() {
        let mask = [true, true, false, true, false, false, true, true, true];
        assert_eq!(true_runs(&mask), vec![0..2, 3..4, 6..9]);
    }

    #[test]
    fn test_all_true() {
        assert_eq!(true_runs(&[true; 4]), vec![0..4]);
    }
}
