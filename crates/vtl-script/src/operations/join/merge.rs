//! Pairwise sort-merge of two key-ordered row streams.
//!
//! Both inputs must arrive sorted ascending by the join key; the merger
//! never sorts. Sortedness is re-checked on every advance, so a stream that
//! breaks the contract terminates the output with a precondition error
//! instead of silently dropping or duplicating rows.

use std::cmp::Ordering as Cmp;

use vtl_model::prelude::*;

use crate::operations::join::JoinType;

/// Precomputed layout of one merge step.
///
/// The output row is `left columns ++ right non-key columns`; `right_map`
/// maps every right position to its output position, key columns landing on
/// the left side's key positions.
#[derive(Debug, Clone)]
pub(crate) struct StepPlan {
    pub left_key: Vec<usize>,
    pub right_key: Vec<usize>,
    pub right_map: Vec<(usize, usize)>,
    pub out_width: usize,
}

impl StepPlan {
    fn combine(&self, left: &DataPoint, right: &DataPoint) -> DataPoint {
        let mut row = self.pad_left(left);
        for &(from, to) in &self.right_map {
            row.set(to, right.get(from).clone());
        }
        row
    }

    fn pad_left(&self, left: &DataPoint) -> DataPoint {
        let mut row = DataPoint::nulls(self.out_width);
        for (index, value) in left.values().iter().enumerate() {
            row.set(index, value.clone());
        }
        row
    }

    fn pad_right(&self, right: &DataPoint) -> DataPoint {
        let mut row = DataPoint::nulls(self.out_width);
        for &(from, to) in &self.right_map {
            row.set(to, right.get(from).clone());
        }
        row
    }
}

pub(crate) fn merge_join(
    left: DataPointStream,
    right: DataPointStream,
    plan: StepPlan,
    join_type: JoinType,
) -> DataPointStream {
    Box::new(MergeJoinIter {
        left: Cursor::new(left),
        right: Cursor::new(right),
        plan,
        join_type,
        done: false,
    })
}

/// One side of the merge: the stream plus a single row of lookahead and the
/// key of the previously consumed row, kept for the monotonicity check.
struct Cursor {
    stream: DataPointStream,
    head: Option<DataPoint>,
    last_key: Option<Vec<VtlValue>>,
    primed: bool,
}

impl Cursor {
    fn new(stream: DataPointStream) -> Self {
        Self {
            stream,
            head: None,
            last_key: None,
            primed: false,
        }
    }

    fn head(&mut self) -> Result<Option<&DataPoint>> {
        if !self.primed {
            self.primed = true;
            self.head = match self.stream.next() {
                Some(row) => Some(row?),
                None => None,
            };
        }
        Ok(self.head.as_ref())
    }

    /// Takes the current row and pulls the next one, verifying that the key
    /// sequence never decreases.
    fn advance(&mut self, key_indexes: &[usize]) -> Result<DataPoint> {
        // Callers only advance after a successful head() returned Some.
        let row = self.head.take().ok_or_else(|| {
            VtlError::Precondition("merge cursor advanced past the end of its stream".to_string())
        })?;
        self.last_key = Some(extract_key(&row, key_indexes));
        self.head = match self.stream.next() {
            Some(next) => {
                let next = next?;
                if let Some(last) = &self.last_key {
                    let next_key = extract_key(&next, key_indexes);
                    if compare_keys(last, &next_key)? == Cmp::Greater {
                        return Err(VtlError::Precondition(
                            "join input stream is not sorted by the join key".to_string(),
                        ));
                    }
                }
                Some(next)
            }
            None => None,
        };
        Ok(row)
    }
}

fn extract_key(row: &DataPoint, indexes: &[usize]) -> Vec<VtlValue> {
    indexes.iter().map(|&i| row.get(i).clone()).collect()
}

fn compare_keys(a: &[VtlValue], b: &[VtlValue]) -> Result<Cmp> {
    for (x, y) in a.iter().zip(b) {
        let compared = x.compare(y)?;
        if compared != Cmp::Equal {
            return Ok(compared);
        }
    }
    Ok(Cmp::Equal)
}

struct MergeJoinIter {
    left: Cursor,
    right: Cursor,
    plan: StepPlan,
    join_type: JoinType,
    done: bool,
}

impl MergeJoinIter {
    fn step(&mut self) -> Result<Option<DataPoint>> {
        loop {
            let left_key = match self.left.head()? {
                Some(row) => Some(extract_key(row, &self.plan.left_key)),
                None => None,
            };
            let right_key = match self.right.head()? {
                Some(row) => Some(extract_key(row, &self.plan.right_key)),
                None => None,
            };

            let compared = match (&left_key, &right_key) {
                (None, None) => return Ok(None),
                // An inner join can never match again once a side is
                // exhausted; an outer join drains the live side through the
                // padding branches as if the missing key were greater than
                // anything.
                (Some(_), None) if self.join_type == JoinType::Inner => return Ok(None),
                (None, Some(_)) if self.join_type == JoinType::Inner => return Ok(None),
                (Some(_), None) => Cmp::Less,
                (None, Some(_)) => Cmp::Greater,
                (Some(l), Some(r)) => compare_keys(l, r)?,
            };

            match compared {
                Cmp::Equal => {
                    let left = self.left.advance(&self.plan.left_key)?;
                    let right = self.right.advance(&self.plan.right_key)?;
                    return Ok(Some(self.plan.combine(&left, &right)));
                }
                Cmp::Less => {
                    let left = self.left.advance(&self.plan.left_key)?;
                    match self.join_type {
                        JoinType::Inner => continue,
                        JoinType::Outer => return Ok(Some(self.plan.pad_left(&left))),
                    }
                }
                Cmp::Greater => {
                    let right = self.right.advance(&self.plan.right_key)?;
                    match self.join_type {
                        JoinType::Inner => continue,
                        JoinType::Outer => return Ok(Some(self.plan.pad_right(&right))),
                    }
                }
            }
        }
    }
}

impl Iterator for MergeJoinIter {
    type Item = Result<DataPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
