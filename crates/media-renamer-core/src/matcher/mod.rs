pub mod similarity;

use crate::normalize::Normalizer;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// A catalog entry (episode or track) a file can be renamed after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub sequence_number: u32,
    /// Only set for audio tracks.
    pub disc_number: Option<u32>,
    pub display_title: String,
    pub normalized_title: String,
}

impl MediaRecord {
    pub fn new(sequence_number: u32, display_title: &str, normalizer: &Normalizer) -> Self {
        Self {
            sequence_number,
            disc_number: None,
            display_title: display_title.to_string(),
            normalized_title: normalizer.normalize(display_title, false),
        }
    }

    pub fn with_disc_number(mut self, disc_number: u32) -> Self {
        self.disc_number = Some(disc_number);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateFile {
    pub original_name: String,
    pub normalized_name: String,
}

impl CandidateFile {
    pub fn new(original_name: &str, normalizer: &Normalizer) -> Self {
        Self {
            original_name: original_name.to_string(),
            normalized_name: normalizer.normalize(original_name, true),
        }
    }
}

/// A file paired with the record it will be renamed after, or with nothing.
/// `score` is the best similarity seen, kept for unmatched files too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub file: CandidateFile,
    pub record: Option<MediaRecord>,
    pub score: f64,
}

impl Assignment {
    pub fn matched(file: CandidateFile, record: MediaRecord, score: f64) -> Self {
        Self {
            file,
            record: Some(record),
            score,
        }
    }

    pub fn unmatched(file: CandidateFile, score: f64) -> Self {
        Self {
            file,
            record: None,
            score,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.record.is_some()
    }
}

/// Indices of records not yet bound to a file. Taking a record consumes the
/// pool and hands back the smaller one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPool {
    available: BTreeSet<usize>,
}

impl RecordPool {
    pub fn full(len: usize) -> Self {
        Self {
            available: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.available.iter().next().copied()
    }

    /// Highest-scoring available record for `key`. Ties keep the record
    /// with the lower index.
    pub fn best_match(&self, records: &[MediaRecord], key: &str) -> Option<(usize, f64)> {
        self.available
            .iter()
            .map(|&index| (index, similarity::ratio(key, &records[index].normalized_title)))
            .fold(None, |best, (index, score)| match best {
                Some((_, best_score)) if score <= best_score => best,
                _ => Some((index, score)),
            })
    }

    pub fn take(mut self, index: usize) -> Self {
        self.available.remove(&index);
        self
    }
}

/// Pair files with records greedily, one file at a time in filename order.
///
/// A file takes the best remaining record when its score reaches `threshold`;
/// the record is then gone for later files. With `fill_unmatched`, files left
/// over are bound in order to the records left over.
pub fn assign(
    files: &[CandidateFile],
    records: &[MediaRecord],
    threshold: f64,
    fill_unmatched: bool,
) -> Vec<Assignment> {
    let mut ordered: Vec<&CandidateFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.original_name.cmp(&b.original_name));

    let (assignments, pool) = ordered.into_iter().fold(
        (Vec::with_capacity(files.len()), RecordPool::full(records.len())),
        |(mut assignments, pool), file| match pool.best_match(records, &file.normalized_name) {
            Some((index, score)) if score >= threshold => {
                debug!(
                    "'{}' matched '{}' (score={:.2})",
                    file.original_name, records[index].display_title, score
                );
                assignments.push(Assignment::matched(
                    file.clone(),
                    records[index].clone(),
                    score,
                ));
                (assignments, pool.take(index))
            }
            best => {
                let score = best.map_or(0.0, |(_, score)| score);
                debug!("'{}' unmatched (best score={:.2})", file.original_name, score);
                assignments.push(Assignment::unmatched(file.clone(), score));
                (assignments, pool)
            }
        },
    );

    if fill_unmatched {
        fill_sequentially(assignments, records, pool)
    } else {
        assignments
    }
}

fn fill_sequentially(
    assignments: Vec<Assignment>,
    records: &[MediaRecord],
    pool: RecordPool,
) -> Vec<Assignment> {
    let (filled, _) = assignments.into_iter().fold(
        (Vec::new(), pool),
        |(mut filled, pool), assignment| match (assignment.is_matched(), pool.first()) {
            (false, Some(index)) => {
                filled.push(Assignment::matched(
                    assignment.file,
                    records[index].clone(),
                    assignment.score,
                ));
                (filled, pool.take(index))
            }
            _ => {
                filled.push(assignment);
                (filled, pool)
            }
        },
    );
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaKindConfig;

    fn normalizer() -> Normalizer {
        Normalizer::new(MediaKindConfig::video().extension_set())
    }

    fn files(names: &[&str]) -> Vec<CandidateFile> {
        let n = normalizer();
        names.iter().map(|name| CandidateFile::new(name, &n)).collect()
    }

    fn records(entries: &[(u32, &str)]) -> Vec<MediaRecord> {
        let n = normalizer();
        entries
            .iter()
            .map(|(num, title)| MediaRecord::new(*num, title, &n))
            .collect()
    }

    fn bound_numbers(assignments: &[Assignment]) -> Vec<Option<u32>> {
        assignments
            .iter()
            .map(|a| a.record.as_ref().map(|r| r.sequence_number))
            .collect()
    }

    #[test]
    fn test_numbering_only_filenames_stay_unmatched() {
        let result = assign(
            &files(&["Show.S01E02.mkv", "Show.S01E01.mkv"]),
            &records(&[(1, "Pilot"), (2, "Awakening")]),
            0.6,
            false,
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].file.original_name, "Show.S01E01.mkv");
        assert_eq!(result[1].file.original_name, "Show.S01E02.mkv");
        assert!(result.iter().all(|a| !a.is_matched() && a.score < 0.6));
    }

    #[test]
    fn test_title_in_filename_matches() {
        let result = assign(&files(&["Show - Pilot.mkv"]), &records(&[(1, "Pilot")]), 0.6, false);
        assert_eq!(bound_numbers(&result), vec![Some(1)]);
        assert!(result[0].score >= 0.6);
    }

    #[test]
    fn test_record_is_consumed() {
        let result = assign(
            &files(&["a Pilot.mkv", "b Pilot.mkv"]),
            &records(&[(1, "Pilot")]),
            0.0,
            false,
        );
        assert_eq!(bound_numbers(&result), vec![Some(1), None]);
    }

    #[test]
    fn test_ties_keep_earlier_record() {
        let result = assign(
            &files(&["zzz.mkv"]),
            &records(&[(1, "Alpha"), (2, "Bravo")]),
            0.0,
            false,
        );
        // Both titles share nothing with the filename; the first one wins.
        assert_eq!(bound_numbers(&result), vec![Some(1)]);
    }

    #[test]
    fn test_zero_threshold_matches_every_file_while_records_last() {
        let result = assign(
            &files(&["x.mkv", "y.mkv", "z.mkv"]),
            &records(&[(1, "One"), (2, "Two")]),
            0.0,
            false,
        );
        let matched = result.iter().filter(|a| a.is_matched()).count();
        assert_eq!(matched, 2);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(assign(&[], &records(&[(1, "Pilot")]), 0.6, true).is_empty());

        let result = assign(&files(&["a.mkv", "b.mkv"]), &[], 0.0, true);
        assert_eq!(bound_numbers(&result), vec![None, None]);
        assert!(result.iter().all(|a| a.score == 0.0));
    }

    #[test]
    fn test_fill_unmatched_binds_leftovers_in_order() {
        let result = assign(
            &files(&["01.mkv", "02 The Return.mkv", "03.mkv"]),
            &records(&[(1, "Pilot"), (2, "The Return"), (3, "Finale")]),
            0.6,
            true,
        );
        assert_eq!(bound_numbers(&result), vec![Some(1), Some(2), Some(3)]);
        // Filled assignments keep the score they had when unmatched.
        assert!(result[0].score < 0.6);
        assert!(result[1].score >= 0.6);
    }

    #[test]
    fn test_exclusive_and_deterministic() {
        let file_list = files(&[
            "Show - Pilot.mkv",
            "Show - Pilot Part 2.mkv",
            "Show - The Return.mkv",
            "Show - Finale.mkv",
            "extra.mkv",
        ]);
        let record_list = records(&[
            (1, "Pilot"),
            (2, "Pilot (2)"),
            (3, "The Return"),
            (4, "Finale"),
        ]);

        let first = assign(&file_list, &record_list, 0.3, true);
        let second = assign(&file_list, &record_list, 0.3, true);
        assert_eq!(first, second);

        let mut seen = BTreeSet::new();
        for number in bound_numbers(&first).into_iter().flatten() {
            assert!(seen.insert(number), "record {} bound twice", number);
        }
    }

    #[test]
    fn test_raising_threshold_never_adds_matches() {
        let file_list = files(&[
            "Show - Pilot.mkv",
            "Show - Retrun.mkv",
            "Show - Fin.mkv",
            "random.mkv",
        ]);
        let record_list = records(&[(1, "Pilot"), (2, "The Return"), (3, "Finale")]);

        let mut previous = usize::MAX;
        for step in 0..=10 {
            let threshold = step as f64 / 10.0;
            let matched = assign(&file_list, &record_list, threshold, false)
                .iter()
                .filter(|a| a.is_matched())
                .count();
            assert!(matched <= previous, "threshold {} matched {}", threshold, matched);
            previous = matched;
        }
    }

    #[test]
    fn test_pool_take_is_functional() {
        let pool = RecordPool::full(3);
        let smaller = pool.clone().take(1);
        assert_eq!(pool.len(), 3);
        assert_eq!(smaller.len(), 2);
        assert_eq!(smaller.first(), Some(0));
        assert!(RecordPool::full(0).is_empty());
    }
}
