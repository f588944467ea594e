//! In-memory column storage.
//!
//! [`MemoryColumnData`] serves the [`FormatData`] and [`LeafData`] contracts from
//! plain vectors: a presence stream (one entry per stored row, `true` = non-null)
//! and the dense non-null values. [`MemoryColumn`] encodes logical column content
//! into such streams for a whole struct tree and builds the matching reader tree.
//!
//! Two null layouts are supported (see [`NullLayout`]): child streams either omit
//! rows whose parent is null, or store a null entry for them.

use std::sync::Arc;

use strata_bits::BitMask;
use strata_common::{Result, error::Error, verify_arg, verify_data};
use strata_vector::{DataType, Value, values::Values};

use crate::{
    config::ReaderConfig,
    flat_reader::FlatColumnReader,
    format_data::{FormatData, LeafData},
    reader::ColumnReader,
    scan_spec::ScanSpec,
    stats::{ColumnStats, FilterRowGroupsResult, StatsContext},
    struct_reader::StructColumnReader,
};

/// How a column stores rows whose parent struct is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullLayout {
    /// Rows under a null parent have no entry; enclosing structs account for them.
    ParentNullsOmitted,
    /// Every column stores an entry for every top-level row; parent nulls are
    /// already encoded in the leaves.
    ParentNullsInLeaves,
}

/// Streams of one column held in memory.
#[derive(Debug, Clone)]
pub struct MemoryColumnData {
    presence: Option<Vec<bool>>,
    num_entries: usize,
    values: Option<Values>,
    position: usize,
    value_position: usize,
    parent_nulls_in_leaves: bool,
    row_group_stats: Vec<ColumnStats>,
}

impl MemoryColumnData {
    /// Streams of a scalar column. Without `presence`, every entry is non-null.
    pub fn leaf(presence: Option<Vec<bool>>, values: Values) -> Result<MemoryColumnData> {
        let num_entries = match presence.as_ref() {
            Some(presence) => {
                let non_nulls = presence.iter().filter(|&&present| present).count();
                verify_arg!(values, values.len() == non_nulls);
                presence.len()
            }
            None => values.len(),
        };
        Ok(MemoryColumnData {
            presence,
            num_entries,
            values: Some(values),
            position: 0,
            value_position: 0,
            parent_nulls_in_leaves: false,
            row_group_stats: Vec::new(),
        })
    }

    /// Null stream of a struct level with `num_entries` entries.
    pub fn nulls_only(presence: Option<Vec<bool>>, num_entries: usize) -> Result<MemoryColumnData> {
        if let Some(presence) = presence.as_ref() {
            verify_arg!(presence, presence.len() == num_entries);
        }
        Ok(MemoryColumnData {
            presence,
            num_entries,
            values: None,
            position: 0,
            value_position: 0,
            parent_nulls_in_leaves: false,
            row_group_stats: Vec::new(),
        })
    }

    pub fn with_parent_nulls_in_leaves(mut self, parent_nulls_in_leaves: bool) -> Self {
        self.parent_nulls_in_leaves = parent_nulls_in_leaves;
        self
    }

    pub fn with_row_group_stats(mut self, row_group_stats: Vec<ColumnStats>) -> Self {
        self.row_group_stats = row_group_stats;
        self
    }

    /// Number of null-stream entries consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn num_entries(&self) -> usize {
        self.num_entries
    }

    fn next_entry_present(&mut self) -> Result<bool> {
        verify_data!(presence, self.position < self.num_entries);
        let present = self
            .presence
            .as_ref()
            .is_none_or(|presence| presence[self.position]);
        self.position += 1;
        Ok(present)
    }
}

impl FormatData for MemoryColumnData {
    fn read_nulls(
        &mut self,
        num_rows: usize,
        incoming_nulls: Option<&BitMask>,
    ) -> Result<Option<BitMask>> {
        let mut nulls = BitMask::empty(num_rows);
        for row in 0..num_rows {
            let parent_null = incoming_nulls.is_some_and(|incoming| incoming.get(row));
            if parent_null && !self.parent_nulls_in_leaves {
                nulls.set(row);
                continue;
            }
            let present = self.next_entry_present()?;
            if parent_null || !present {
                nulls.set(row);
            }
        }
        Ok(nulls.any().then_some(nulls))
    }

    fn skip_nulls(&mut self, num_values: u64) -> Result<u64> {
        let num_values = num_values as usize;
        verify_data!(presence, self.position + num_values <= self.num_entries);
        let skipped = self.position..self.position + num_values;
        let non_nulls = match self.presence.as_ref() {
            Some(presence) => presence[skipped].iter().filter(|&&present| present).count(),
            None => num_values,
        };
        self.position += num_values;
        Ok(non_nulls as u64)
    }

    fn parent_nulls_in_leaves(&self) -> bool {
        self.parent_nulls_in_leaves
    }

    fn filter_row_groups(
        &self,
        scan_spec: &ScanSpec,
        row_group_size: u64,
        context: &StatsContext,
        result: &mut FilterRowGroupsResult,
    ) -> Result<()> {
        verify_arg!(row_group_size, row_group_size > 0);
        let Some(filter) = scan_spec.filter() else {
            return Ok(());
        };
        let num_row_groups = context.row_group_count(row_group_size);
        result.ensure_count(num_row_groups);
        for (row_group, stats) in self.row_group_stats.iter().enumerate().take(num_row_groups) {
            if !filter.test_stats(stats) {
                result.skip(row_group);
            }
        }
        Ok(())
    }
}

impl LeafData for MemoryColumnData {
    fn read_values(&mut self, count: usize) -> Result<Values> {
        let values = self
            .values
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("read_values on a struct level"))?;
        let end = self.value_position + count;
        verify_data!(values, end <= values.len());
        let result = values.slice(self.value_position..end);
        self.value_position = end;
        Ok(result)
    }

    fn skip_values(&mut self, count: u64) -> Result<()> {
        let len = self.values.as_ref().map_or(0, Values::len);
        let end = self.value_position + count as usize;
        verify_data!(values, end <= len);
        self.value_position = end;
        Ok(())
    }
}

/// Logical content of a column, one entry per top-level row.
#[derive(Debug, Clone)]
pub enum ColumnContent {
    /// `Value::Null` marks a null row.
    Scalar {
        data_type: DataType,
        values: Vec<Value>,
    },
    /// `nulls[row]` marks a null struct row; fields under a null row are ignored.
    Struct {
        nulls: Vec<bool>,
        fields: Vec<(String, ColumnContent)>,
    },
}

impl ColumnContent {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnContent::Scalar { data_type, .. } => data_type.clone(),
            ColumnContent::Struct { fields, .. } => DataType::struct_of(
                fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.data_type())),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnContent::Scalar { values, .. } => values.len(),
            ColumnContent::Struct { nulls, .. } => nulls.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An encoded column tree.
#[derive(Debug, Clone)]
pub struct MemoryColumn {
    data_type: DataType,
    data: MemoryColumnData,
    children: Vec<MemoryColumn>,
}

impl MemoryColumn {
    /// Encodes `content` with the given null layout, keeping statistics for every
    /// `row_group_size` top-level rows.
    pub fn encode(
        content: &ColumnContent,
        layout: NullLayout,
        row_group_size: usize,
    ) -> Result<MemoryColumn> {
        verify_arg!(row_group_size, row_group_size > 0);
        Self::encode_under(content, None, layout, row_group_size)
    }

    fn encode_under(
        content: &ColumnContent,
        parent_nulls: Option<&[bool]>,
        layout: NullLayout,
        row_group_size: usize,
    ) -> Result<MemoryColumn> {
        let num_rows = content.len();
        if let Some(parent_nulls) = parent_nulls {
            verify_arg!(content, parent_nulls.len() == num_rows);
        }
        let parent_null = |row: usize| parent_nulls.is_some_and(|nulls| nulls[row]);
        let stored = |row: &usize| layout == NullLayout::ParentNullsInLeaves || !parent_null(*row);
        let in_leaves = layout == NullLayout::ParentNullsInLeaves;

        match content {
            ColumnContent::Scalar { data_type, values } => {
                let effective: Vec<Value> = values
                    .iter()
                    .enumerate()
                    .map(|(row, value)| if parent_null(row) { Value::Null } else { value.clone() })
                    .collect();
                let presence = (0..num_rows)
                    .filter(stored)
                    .map(|row| !effective[row].is_null())
                    .collect();
                let dense = Values::from_values(
                    data_type,
                    effective.iter().filter(|value| !value.is_null()),
                )?;
                let stats = effective
                    .chunks(row_group_size)
                    .map(|chunk| ColumnStats::from_values(chunk))
                    .collect();
                let data = MemoryColumnData::leaf(Some(presence), dense)?
                    .with_parent_nulls_in_leaves(in_leaves)
                    .with_row_group_stats(stats);
                Ok(MemoryColumn {
                    data_type: data_type.clone(),
                    data,
                    children: Vec::new(),
                })
            }
            ColumnContent::Struct { nulls, fields } => {
                let effective: Vec<bool> = nulls
                    .iter()
                    .enumerate()
                    .map(|(row, &null)| null || parent_null(row))
                    .collect();
                let presence: Vec<bool> = (0..num_rows)
                    .filter(stored)
                    .map(|row| !effective[row])
                    .collect();
                let stats = effective
                    .chunks(row_group_size)
                    .map(|chunk| ColumnStats::from_nulls(chunk.iter().copied()))
                    .collect();
                let data = MemoryColumnData::nulls_only(Some(presence.clone()), presence.len())?
                    .with_parent_nulls_in_leaves(in_leaves)
                    .with_row_group_stats(stats);
                let children = fields
                    .iter()
                    .map(|(_, field)| {
                        Self::encode_under(field, Some(&effective), layout, row_group_size)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(MemoryColumn {
                    data_type: content.data_type(),
                    data,
                    children,
                })
            }
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn data(&self) -> &MemoryColumnData {
        &self.data
    }

    /// Builds the root struct reader for `scan_spec` over this (struct) column.
    pub fn into_root_reader(
        self,
        scan_spec: Arc<ScanSpec>,
        config: ReaderConfig,
    ) -> Result<StructColumnReader> {
        verify_arg!(data_type, self.data_type.is_struct());
        let config = Arc::new(config);
        let children = build_children(self.children, &scan_spec, &config, true)?;
        StructColumnReader::root(
            scan_spec,
            self.data_type,
            Box::new(self.data),
            children,
            config,
        )
    }

    fn into_reader(
        self,
        scan_spec: Arc<ScanSpec>,
        config: &Arc<ReaderConfig>,
        is_top_level: bool,
    ) -> Result<Box<dyn ColumnReader>> {
        if self.data_type.is_struct() {
            let children = build_children(self.children, &scan_spec, config, false)?;
            let reader = StructColumnReader::nested(
                scan_spec,
                self.data_type,
                Box::new(self.data),
                children,
                config.clone(),
                is_top_level,
            )?;
            Ok(Box::new(reader))
        } else {
            let reader = FlatColumnReader::new(scan_spec, Box::new(self.data), is_top_level)?;
            Ok(Box::new(reader))
        }
    }
}

/// Builds one reader per file field referenced by a non-constant child spec,
/// indexed by the field position (the child spec's subscript).
fn build_children(
    columns: Vec<MemoryColumn>,
    scan_spec: &ScanSpec,
    config: &Arc<ReaderConfig>,
    is_top_level: bool,
) -> Result<Vec<Option<Box<dyn ColumnReader>>>> {
    let mut readers: Vec<Option<Box<dyn ColumnReader>>> = (0..columns.len()).map(|_| None).collect();
    let mut columns: Vec<Option<MemoryColumn>> = columns.into_iter().map(Some).collect();
    for child_spec in scan_spec.children() {
        if child_spec.is_constant() {
            continue;
        }
        let Some(subscript) = child_spec.subscript() else {
            continue;
        };
        let Some(column) = columns.get_mut(subscript).and_then(Option::take) else {
            continue;
        };
        readers[subscript] = Some(column.into_reader(child_spec.clone(), config, is_top_level)?);
    }
    Ok(readers)
}
