use indexmap::IndexMap;

use crate::types::{SourceId, Timestamp};

/// Merges the watermarks of multiple inputs into a single frontier.
///
/// The frontier is the merge (minimum) of all input watermarks. It is undefined until
/// every input reported at least once and it never moves backwards.
#[derive(Debug, Clone)]
pub struct MergedFrontier<T> {
    inputs: IndexMap<SourceId, Option<T>>,
    frontier: Option<T>,
}

impl<T: Timestamp> MergedFrontier<T> {
    /// Create a frontier over the given inputs
    pub fn new(inputs: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            inputs: inputs.into_iter().map(|i| (i, None)).collect(),
            frontier: None,
        }
    }

    /// Update the watermark of one input. Returns the new frontier if it advanced.
    /// Watermarks of unknown inputs are ignored, as are regressions of an input.
    pub fn advance(&mut self, input: SourceId, epoch: T) -> Option<T> {
        let slot = self.inputs.get_mut(&input)?;
        if slot.as_ref().is_some_and(|prev| *prev >= epoch) {
            return None;
        }
        *slot = Some(epoch);

        let merged = merge_timestamps(self.inputs.values())?;
        if self.frontier.as_ref().is_none_or(|f| *f < merged) {
            self.frontier = Some(merged.clone());
            Some(merged)
        } else {
            None
        }
    }

    /// The current merged frontier
    pub fn get(&self) -> Option<&T> {
        self.frontier.as_ref()
    }
}

/// Reducer merging the watermarks of all inputs, `None` if any input has none yet
fn merge_timestamps<'a, T: Timestamp>(
    mut timestamps: impl Iterator<Item = &'a Option<T>>,
) -> Option<T> {
    let mut merged = timestamps.next()?.clone()?;
    for x in timestamps {
        merged = merged.merge(x.as_ref()?);
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_requires_all_inputs() {
        assert_eq!(merge_timestamps([None, Some(43)].iter()), None);
        assert_eq!(merge_timestamps([Some(42), Some(43)].iter()), Some(42));
        assert_eq!(merge_timestamps::<i32>([None, None].iter()), None);
        assert_eq!(merge_timestamps::<i32>([].iter()), None);
    }

    #[test]
    fn frontier_is_min_of_inputs() {
        let mut frontier = MergedFrontier::new([0, 1]);
        assert_eq!(frontier.advance(0, 5000i64), None);
        assert_eq!(frontier.advance(1, 3000), Some(3000));
        assert_eq!(frontier.advance(1, 7000), Some(5000));
        assert_eq!(frontier.get(), Some(&5000));
    }

    #[test]
    fn frontier_only_advances() {
        let mut frontier = MergedFrontier::new([0]);
        assert_eq!(frontier.advance(0, 10i64), Some(10));
        assert_eq!(frontier.advance(0, 5), None);
        assert_eq!(frontier.advance(0, 10), None);
        assert_eq!(frontier.get(), Some(&10));
    }

    #[test]
    fn finished_input_reports_max() {
        let mut frontier = MergedFrontier::new([0, 1]);
        frontier.advance(0, i64::MAX);
        assert_eq!(frontier.advance(1, 100), Some(100));
        assert_eq!(frontier.advance(1, i64::MAX), Some(i64::MAX));
    }

    #[test]
    fn unknown_input_ignored() {
        let mut frontier = MergedFrontier::new([0]);
        assert_eq!(frontier.advance(3, 10i64), None);
        assert_eq!(frontier.get(), None);
    }
}
