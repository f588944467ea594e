use std::sync::Arc;

use strata_vector::{DataType, Value, Vector, VectorRef, flat::FlatVector, values::Values};

use crate::{
    config::ReaderConfig,
    memory_data::{ColumnContent, NullLayout},
    scan_spec::ScanSpec,
    struct_reader::StructColumnReader,
    tests::data_generator::{
        build_reader, field, int_column, load_fields, nulls_at, project_all_reader, struct_column,
    },
};

fn content() -> ColumnContent {
    let x = int_column(&(0..12).map(|v| Some(v * 2)).collect::<Vec<_>>());
    struct_column(
        vec![false; 12],
        vec![
            ("a", int_column(&(0..12).map(Some).collect::<Vec<_>>())),
            ("s", struct_column(nulls_at(&[3, 9], 12), vec![("x", x)])),
        ],
    )
}

fn empty_result(reader: &StructColumnReader) -> Option<VectorRef> {
    Some(Arc::new(Vector::empty_row(reader.requested_type().clone())))
}

#[test]
fn test_unique_result_is_reused() {
    for config in [ReaderConfig::default(), ReaderConfig::default().eager()] {
        let lazy_loading = config.lazy_loading;
        let mut reader = project_all_reader(&content(), NullLayout::ParentNullsOmitted, config);
        let mut result = empty_result(&reader);
        reader.next(4, &mut result, None).unwrap();
        let batch_ptr = Arc::as_ptr(result.as_ref().unwrap());
        let row = result.as_ref().unwrap().as_row().unwrap();
        let a_ptr = Arc::as_ptr(row.child_at(0).unwrap());
        let s_ptr = Arc::as_ptr(row.child_at(1).unwrap());
        if lazy_loading {
            load_fields(result.as_mut().unwrap(), &mut reader).unwrap();
        }

        reader.next(4, &mut result, None).unwrap();
        let batch = result.as_ref().unwrap();
        assert_eq!(Arc::as_ptr(batch), batch_ptr);
        let row = batch.as_row().unwrap();
        if lazy_loading {
            // Lazy placeholders are rebound in place.
            assert_eq!(Arc::as_ptr(row.child_at(0).unwrap()), a_ptr);
            assert_eq!(Arc::as_ptr(row.child_at(1).unwrap()), s_ptr);
            load_fields(result.as_mut().unwrap(), &mut reader).unwrap();
        } else {
            // Nested row containers are reused; flat leaves are recreated.
            assert_eq!(Arc::as_ptr(row.child_at(1).unwrap()), s_ptr);
        }
        let batch = result.as_ref().unwrap();
        assert_eq!(field(batch, 0).value_at(0), Value::Int64(4));
        let s = field(batch, 1);
        assert!(!s.is_null_at(0));
        assert_eq!(field(s, 0).value_at(0), Value::Int64(8));
    }
}

#[test]
fn test_shared_result_is_not_mutated() {
    let mut reader =
        project_all_reader(&content(), NullLayout::ParentNullsOmitted, ReaderConfig::default().eager());
    let mut result = empty_result(&reader);
    reader.next(6, &mut result, None).unwrap();
    let held = result.clone().unwrap();
    reader.next(6, &mut result, None).unwrap();

    let fresh = result.as_ref().unwrap();
    assert!(!Arc::ptr_eq(fresh, &held));
    assert_eq!(held.len(), 6);
    assert_eq!(field(&held, 0).value_at(5), Value::Int64(5));
    assert!(field(&held, 1).is_null_at(3));
    assert_eq!(field(fresh, 0).value_at(5), Value::Int64(11));
    assert!(field(fresh, 1).is_null_at(3));
    assert!(!field(fresh, 1).is_null_at(2));
}

#[test]
fn test_constant_field_is_refreshed_in_place() {
    let query_type = DataType::struct_of([("a", DataType::Int64), ("d", DataType::String)]);
    let spec = ScanSpec::new("root", query_type).with_project_out(true).with_children(vec![
        ScanSpec::new("a", DataType::Int64)
            .with_channel(0)
            .with_subscript(0)
            .with_project_out(true),
        ScanSpec::new("d", DataType::String)
            .with_channel(1)
            .with_project_out(true)
            .with_constant(Value::from("x")),
    ]);
    let mut reader = build_reader(&content(), NullLayout::ParentNullsOmitted, spec, ReaderConfig::default());
    let mut result = empty_result(&reader);
    reader.next(5, &mut result, None).unwrap();
    let d_ptr = Arc::as_ptr(result.as_ref().unwrap().as_row().unwrap().child_at(1).unwrap());
    reader.next(3, &mut result, None).unwrap();
    let d = field(result.as_ref().unwrap(), 1);
    assert_eq!(d as *const Vector, d_ptr);
    assert_eq!(d.len(), 3);
    assert_eq!(d.value_at(2), Value::from("x"));
}

#[test]
fn test_result_must_be_a_row_vector() {
    let mut reader = project_all_reader(&content(), NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let mut missing = None;
    let err = reader.next(2, &mut missing, None).unwrap_err();
    assert!(err.is_contract_violation());

    let flat = FlatVector::try_new(Values::Int64(vec![1]), None).unwrap();
    let mut wrong = Some(Arc::new(Vector::Flat(flat)));
    let err = reader.next(2, &mut wrong, None).unwrap_err();
    assert!(err.is_contract_violation());
}
