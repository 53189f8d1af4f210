// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! The cut pool.
//!
//! Cuts pruned from the LP are kept here as tour-independent records and
//! re-priced against later LP solutions. The pool is persisted as a JSON
//! array of records.

use crate::hypergraph::{CutKey, CutRecord, ExpandedCut};
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tourcut_core::error::Result;
use tourcut_lp::support::SupportGraph;

#[derive(Clone, Debug, Default)]
pub struct CutPool {
    records: Vec<CutRecord>,
    keys: FxHashSet<CutKey>,
}

impl CutPool {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record unless an identical cut is pooled already.
    pub fn add(&mut self, record: CutRecord) -> bool {
        if !self.keys.insert(record.key()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Adds every record; returns how many were new.
    pub fn extend<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = CutRecord>,
    {
        records.into_iter().filter(|r| self.add(r.clone())).count()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, CutRecord> {
        self.records.iter()
    }

    /// Pooled cuts violated by more than `min_violation`, most violated
    /// first. Records that do not fit `node_count` nodes are skipped.
    pub fn separate(
        &self,
        support: &SupportGraph,
        min_violation: f64,
    ) -> Vec<(ExpandedCut, f64)> {
        let n = support.node_count();
        let mut found: Vec<(ExpandedCut, f64)> = self
            .records
            .iter()
            .filter_map(|r| match ExpandedCut::from_record(n, r) {
                Ok(cut) => Some(cut),
                Err(e) => {
                    log::debug!("skipping pooled cut: {}", e);
                    None
                }
            })
            .filter_map(|cut| {
                let violation = cut.violation(support);
                (violation > min_violation).then_some((cut, violation))
            })
            .collect();
        found.sort_by(|a, b| b.1.total_cmp(&a.1));
        found
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.records)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<CutRecord> = serde_json::from_str(json)?;
        let mut pool = Self::new();
        pool.extend(records);
        Ok(pool)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, &self.records)?;
        log::info!(
            "saved {} pooled cuts to {}",
            self.records.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let records: Vec<CutRecord> = serde_json::from_reader(reader)?;
        let mut pool = Self::new();
        pool.extend(records);
        log::info!(
            "loaded {} pooled cuts from {}",
            pool.len(),
            path.as_ref().display()
        );
        Ok(pool)
    }
}

impl<'a> IntoIterator for &'a CutPool {
    type Item = &'a CutRecord;
    type IntoIter = std::slice::Iter<'a, CutRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::CutKind;
    use tourcut_model::graph::{CoreGraph, EndPts};

    fn prism_support() -> SupportGraph {
        let mut g = CoreGraph::new(6);
        let mut x = Vec::new();
        for (u, v, val) in [
            (0, 1, 0.5),
            (1, 2, 0.5),
            (0, 2, 0.5),
            (3, 4, 0.5),
            (4, 5, 0.5),
            (3, 5, 0.5),
            (0, 3, 1.0),
            (1, 4, 1.0),
            (2, 5, 1.0),
        ] {
            g.add_edge(EndPts::new(u, v), 1);
            x.push(val);
        }
        SupportGraph::new(&g, &x)
    }

    fn records() -> Vec<CutRecord> {
        vec![
            ExpandedCut::subtour(6, &[0, 1, 2]).unwrap().to_record(),
            ExpandedCut::domino(6, &[0, 1, 2], &[(0, vec![3]), (1, vec![4]), (2, vec![5])])
                .unwrap()
                .to_record(),
            ExpandedCut::comb(6, &[0, 1, 2], &[vec![0, 3], vec![1, 4], vec![2, 5]])
                .unwrap()
                .to_record(),
        ]
    }

    #[test]
    fn test_add_deduplicates() {
        let mut pool = CutPool::new();
        assert_eq!(pool.extend(records()), 3);
        assert_eq!(pool.extend(records()), 0);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_separate_orders_by_violation() {
        let mut pool = CutPool::new();
        pool.extend(records());
        let found = pool.separate(&prism_support(), 1e-3);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0.kind(), CutKind::Blossom);
        assert!((found[0].1 - 1.0).abs() < 1e-9);
        assert_eq!(found[1].0.kind(), CutKind::DominoParity);
    }

    #[test]
    fn test_save_and_load_json() {
        let mut pool = CutPool::new();
        pool.extend(records());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.json");
        pool.save_json(&path).unwrap();
        let loaded = CutPool::load_json(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(
            loaded.iter().collect::<Vec<_>>(),
            pool.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"{\"not\": \"a pool\"}").unwrap();
        assert!(CutPool::load_json(file.path()).is_err());
        assert!(CutPool::from_json_str("[]").unwrap().is_empty());
    }
}
