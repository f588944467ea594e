use std::sync::Arc;

use strata_bits::BitMask;
use strata_common::error::ErrorKind;
use strata_vector::{DataType, Value, Vector};

use crate::{
    config::ReaderConfig,
    memory_data::{ColumnContent, NullLayout},
    mutation::Mutation,
    reader::ColumnReader,
    row_set::RowIndex,
    scan_spec::ScanSpec,
    tests::data_generator::{
        build_reader, field, int_column, next_batch, nulls_at, project_all_reader, struct_column,
    },
};

const LAYOUTS: [NullLayout; 2] = [NullLayout::ParentNullsOmitted, NullLayout::ParentNullsInLeaves];

/// `{s: {a: Int64, b: {c: Int64}}}` with `s` null at rows 2 and 7, `b` null at row 5.
fn outer_struct_content() -> ColumnContent {
    let a = int_column(&(0..10).map(Some).collect::<Vec<_>>());
    let c = int_column(&(100..110).map(Some).collect::<Vec<_>>());
    let b = struct_column(nulls_at(&[5], 10), vec![("c", c)]);
    let s = struct_column(nulls_at(&[2, 7], 10), vec![("a", a), ("b", b)]);
    struct_column(vec![false; 10], vec![("s", s)])
}

fn null_rows(vector: &Vector) -> Vec<usize> {
    (0..vector.len()).filter(|&i| vector.is_null_at(i)).collect()
}

#[test]
fn test_nulls_propagate_into_nested_fields() {
    for layout in LAYOUTS {
        let content = outer_struct_content();
        let mut reader = project_all_reader(&content, layout, ReaderConfig::default().eager());
        let rows: Vec<RowIndex> = (0..10).collect();
        reader.read(0, &rows, None).unwrap();
        assert_eq!(reader.read_offset(), 10);

        let mut result = Some(Arc::new(Vector::empty_row(content.data_type())));
        reader.get_values(&rows, &mut result).unwrap();
        let batch = result.unwrap();
        assert_eq!(batch.len(), 10);

        let s = field(&batch, 0);
        assert_eq!(null_rows(s), [2, 7]);
        let a = field(s, 0);
        let b = field(s, 1);
        assert_eq!(null_rows(a), [2, 7], "{layout:?}");
        assert_eq!(null_rows(b), [2, 5, 7], "{layout:?}");
        assert_eq!(a.value_at(9), Value::Int64(9));
        let c = field(b, 0);
        assert_eq!(c.value_at(6), Value::Int64(106));
        assert_eq!(c.value_at(8), Value::Int64(108));
        assert!(c.is_null_at(5));
    }
}

#[test]
fn test_mutation_removes_deleted_rows() {
    let content = struct_column(
        vec![false; 5],
        vec![("a", int_column(&[Some(10), Some(11), None, Some(13), Some(14)]))],
    );
    let mut reader =
        project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default().eager());
    let mutation = Mutation::new(BitMask::from_positions([1, 3], 5));
    let batch = next_batch(&mut reader, 5, Some(&mutation)).unwrap();
    assert_eq!(reader.output_rows(), [0, 2, 4]);
    assert_eq!(batch.len(), 3);
    let a = field(&batch, 0);
    assert_eq!(a.value_at(0), Value::Int64(10));
    assert!(a.is_null_at(1));
    assert_eq!(a.value_at(2), Value::Int64(14));
    assert_eq!(reader.read_offset(), 5);
}

#[test]
fn test_fully_deleted_batch_advances() {
    let content = struct_column(
        vec![false; 8],
        vec![("a", int_column(&(0..8).map(Some).collect::<Vec<_>>()))],
    );
    let mut reader =
        project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default().eager());
    let mutation = Mutation::new(BitMask::full(4));
    let batch = next_batch(&mut reader, 4, Some(&mutation)).unwrap();
    assert!(batch.is_empty());
    assert_eq!(reader.read_offset(), 4);

    let batch = next_batch(&mut reader, 4, None).unwrap();
    assert_eq!(field(&batch, 0).value_at(0), Value::Int64(4));
}

#[test]
fn test_missing_column_is_null_constant() {
    let content = struct_column(vec![false; 6], vec![("a", int_column(&[Some(1); 6]))]);
    let query_type = DataType::struct_of([("a", DataType::Int64), ("d", DataType::Int64)]);
    let spec = ScanSpec::new("root", query_type).with_project_out(true).with_children(vec![
        ScanSpec::new("a", DataType::Int64)
            .with_channel(0)
            .with_subscript(0)
            .with_project_out(true),
        ScanSpec::new("d", DataType::Int64)
            .with_channel(1)
            .with_project_out(true),
    ]);
    let mut reader = build_reader(&content, NullLayout::ParentNullsOmitted, spec, ReaderConfig::default());
    let batch = next_batch(&mut reader, 6, None).unwrap();
    let d = field(&batch, 1);
    assert!(d.is_constant());
    assert_eq!(d.len(), 6);
    assert!((0..6).all(|i| d.is_null_at(i)));
}

#[test]
fn test_field_added_after_file_was_written() {
    let s = struct_column(vec![false, true, false], vec![("a", int_column(&[Some(1), Some(2), Some(3)]))]);
    let content = struct_column(vec![false; 3], vec![("s", s)]);
    let s_type = DataType::struct_of([("a", DataType::Int64), ("z", DataType::String)]);
    let spec = ScanSpec::new("root", DataType::struct_of([("s", s_type.clone())]))
        .with_project_out(true)
        .with_children(vec![
            ScanSpec::new("s", s_type)
                .with_channel(0)
                .with_subscript(0)
                .with_project_out(true)
                .with_children(vec![
                    ScanSpec::new("a", DataType::Int64)
                        .with_channel(0)
                        .with_subscript(0)
                        .with_project_out(true),
                    ScanSpec::new("z", DataType::String)
                        .with_channel(1)
                        .with_subscript(1)
                        .with_project_out(true),
                ]),
        ]);
    let mut reader = build_reader(
        &content,
        NullLayout::ParentNullsOmitted,
        spec,
        ReaderConfig::default().eager(),
    );
    let batch = next_batch(&mut reader, 3, None).unwrap();
    let s = field(&batch, 0);
    assert!(s.is_null_at(1));
    assert_eq!(field(s, 0).value_at(2), Value::Int64(3));
    let z = field(s, 1);
    assert!(z.is_constant());
    assert!(z.is_null_at(0));
}

#[test]
fn test_constant_only_projection() {
    let content = struct_column(vec![false; 4], vec![("a", int_column(&[Some(1); 4]))]);
    let query_type = DataType::struct_of([("k", DataType::Int64)]);
    let spec = ScanSpec::new("root", query_type)
        .with_project_out(true)
        .with_children(vec![
            ScanSpec::new("k", DataType::Int64)
                .with_channel(0)
                .with_project_out(true)
                .with_constant(Value::Int64(7)),
        ]);
    let mut reader = build_reader(&content, NullLayout::ParentNullsOmitted, spec, ReaderConfig::default());
    let mutation = Mutation::new(BitMask::from_positions([1], 4));
    let batch = next_batch(&mut reader, 4, Some(&mutation)).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(field(&batch, 0).value_at(2), Value::Int64(7));
    assert_eq!(reader.read_offset(), 4);
    assert_eq!(reader.epoch(), 1);

    let mut result = None;
    let err = reader.get_values(&[0], &mut result).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_projection_of_missing_fields_only() {
    let content = struct_column(vec![false; 4], vec![("a", int_column(&[Some(1); 4]))]);
    let query_type = DataType::struct_of([("d", DataType::String), ("k", DataType::Int64)]);
    let spec = ScanSpec::new("root", query_type)
        .with_project_out(true)
        .with_children(vec![
            ScanSpec::new("d", DataType::String)
                .with_channel(0)
                .with_project_out(true),
            ScanSpec::new("k", DataType::Int64)
                .with_channel(1)
                .with_project_out(true)
                .with_constant(Value::Int64(3)),
        ]);
    let mut reader = build_reader(&content, NullLayout::ParentNullsOmitted, spec, ReaderConfig::default());
    let batch = next_batch(&mut reader, 4, None).unwrap();
    assert_eq!(batch.len(), 4);
    let d = field(&batch, 0);
    assert!(d.is_constant());
    assert_eq!(d.len(), 4);
    assert!((0..4).all(|row| d.is_null_at(row)));
    assert_eq!(field(&batch, 1).value_at(3), Value::Int64(3));

    let mutation = Mutation::new(BitMask::from_positions([0, 2], 4));
    let batch = next_batch(&mut reader, 4, Some(&mutation)).unwrap();
    assert_eq!(field(&batch, 0).len(), 2);
    assert!(field(&batch, 0).is_null_at(1));
    assert_eq!(reader.read_offset(), 8);
}

#[test]
fn test_children_less_reader_rejects_non_constant_fields() {
    // `a` points past the file's fields, so no child reader backs it.
    let content = struct_column(vec![false; 4], vec![("a", int_column(&[Some(1); 4]))]);
    let spec = ScanSpec::new("root", content.data_type())
        .with_project_out(true)
        .with_children(vec![
            ScanSpec::new("a", DataType::Int64)
                .with_channel(0)
                .with_subscript(5)
                .with_project_out(true),
        ]);
    let mut reader = build_reader(&content, NullLayout::ParentNullsOmitted, spec, ReaderConfig::default());
    let err = next_batch(&mut reader, 4, None).unwrap_err();
    assert!(err.is_contract_violation());
    let err = reader.read(0, &[0, 1], None).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_next_is_root_only_and_bounded() {
    let content = outer_struct_content();
    let config = ReaderConfig {
        max_batch_rows: 8,
        ..ReaderConfig::default()
    };
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, config);
    let err = next_batch(&mut reader, 9, None).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));

    let nested_id = reader.child(0).unwrap().base().id();
    let nested = reader.find_struct_reader(nested_id).unwrap();
    assert!(!nested.is_root());
    let mut result = Some(Arc::new(Vector::empty_row(nested.requested_type().clone())));
    let err = nested.next(2, &mut result, None).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_invalid_config_is_rejected() {
    let content = outer_struct_content();
    let spec = ScanSpec::project_all("root", &content.data_type());
    let config = ReaderConfig {
        max_batch_rows: 0,
        ..ReaderConfig::default()
    };
    let reader = crate::memory_data::MemoryColumn::encode(&content, NullLayout::ParentNullsOmitted, 10)
        .unwrap()
        .into_root_reader(Arc::new(spec), config);
    assert!(reader.is_err());
}
