//! Scan specification tree.
//!
//! A [`ScanSpec`] mirrors the query's view of one column: whether it is projected,
//! the filter it carries, a constant override, where it lands in the output row
//! (`channel`) and which child reader of the enclosing struct decodes it
//! (`subscript`). The tree is built once per scan and shared read-only by the
//! readers.

use std::sync::Arc;

use strata_vector::{DataType, Value};

use crate::{filter::Filter, selectivity::Selectivity};

#[derive(Debug)]
pub struct ScanSpec {
    name: String,
    data_type: DataType,
    channel: Option<usize>,
    subscript: Option<usize>,
    project_out: bool,
    extract_values: bool,
    filter: Option<Filter>,
    constant_value: Option<Value>,
    children: Vec<Arc<ScanSpec>>,
    selectivity: Selectivity,
}

impl ScanSpec {
    /// Creates an unfiltered, non-projected node with no channel and no subscript.
    pub fn new(name: impl Into<String>, data_type: DataType) -> ScanSpec {
        ScanSpec {
            name: name.into(),
            data_type,
            channel: None,
            subscript: None,
            project_out: false,
            extract_values: false,
            filter: None,
            constant_value: None,
            children: Vec::new(),
            selectivity: Selectivity::default(),
        }
    }

    /// Builds the spec tree that projects every field of `data_type`, with channel
    /// and subscript equal to the field position at every level.
    pub fn project_all(name: impl Into<String>, data_type: &DataType) -> ScanSpec {
        let children = data_type
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| {
                ScanSpec::project_all(field.name.clone(), &field.data_type)
                    .with_channel(i)
                    .with_subscript(i)
            })
            .collect();
        ScanSpec::new(name, data_type.clone())
            .with_project_out(true)
            .with_children(children)
    }

    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_subscript(mut self, subscript: usize) -> Self {
        self.subscript = Some(subscript);
        self
    }

    /// Marks the field as absent from the file.
    pub fn without_subscript(mut self) -> Self {
        self.subscript = None;
        self
    }

    pub fn with_project_out(mut self, project_out: bool) -> Self {
        self.project_out = project_out;
        self
    }

    pub fn with_extract_values(mut self, extract_values: bool) -> Self {
        self.extract_values = extract_values;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_constant(mut self, value: Value) -> Self {
        self.constant_value = Some(value);
        self
    }

    pub fn with_children(mut self, children: Vec<ScanSpec>) -> Self {
        self.children = children.into_iter().map(Arc::new).collect();
        self
    }

    /// Replaces the child named `name` by the result of `f`.
    pub fn map_child(mut self, name: &str, f: impl FnOnce(ScanSpec) -> ScanSpec) -> Self {
        if let Some(pos) = self.children.iter().position(|c| c.name == name) {
            let child = self.children.remove(pos);
            let child = Arc::try_unwrap(child).unwrap_or_else(|shared| shared.detached());
            self.children.insert(pos, Arc::new(f(child)));
        }
        self
    }

    /// Copy of this node without its accumulated selectivity.
    fn detached(&self) -> ScanSpec {
        ScanSpec {
            name: self.name.clone(),
            data_type: self.data_type.clone(),
            channel: self.channel,
            subscript: self.subscript,
            project_out: self.project_out,
            extract_values: self.extract_values,
            filter: self.filter.clone(),
            constant_value: self.constant_value.clone(),
            children: self.children.clone(),
            selectivity: Selectivity::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Position of the field in the output row, `None` when it is not output.
    pub fn channel(&self) -> Option<usize> {
        self.channel
    }

    /// Index of the child reader in the enclosing struct reader, `None` when the
    /// field does not exist in the file.
    pub fn subscript(&self) -> Option<usize> {
        self.subscript
    }

    pub fn project_out(&self) -> bool {
        self.project_out
    }

    /// Whether downstream requires decoded values (no lazy vector).
    pub fn extract_values(&self) -> bool {
        self.extract_values
    }

    /// The filter of this node alone.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Whether this node or any node below it carries a filter.
    pub fn has_filter(&self) -> bool {
        self.filter.is_some() || self.children.iter().any(|child| child.has_filter())
    }

    pub fn is_constant(&self) -> bool {
        self.constant_value.is_some()
    }

    pub fn constant_value(&self) -> Option<&Value> {
        self.constant_value.as_ref()
    }

    pub fn children(&self) -> &[Arc<ScanSpec>] {
        &self.children
    }

    pub fn child_by_name(&self, name: &str) -> Option<&Arc<ScanSpec>> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn selectivity(&self) -> &Selectivity {
        &self.selectivity
    }
}
