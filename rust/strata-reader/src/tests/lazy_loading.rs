use std::sync::Arc;

use itertools::Itertools;
use strata_vector::{Value, Vector, VectorRef, lazy::ensure_loaded};

use crate::{
    config::ReaderConfig,
    memory_data::{ColumnContent, NullLayout},
    reader::ColumnReader,
    tests::data_generator::{
        FieldProperties, check_batch, field, generate_content, int_column, load_fields,
        nested_test_type, next_batch, project_all_reader, struct_column,
    },
};

fn two_columns(num_rows: i64) -> ColumnContent {
    struct_column(
        vec![false; num_rows as usize],
        vec![
            ("a", int_column(&(0..num_rows).map(Some).collect::<Vec<_>>())),
            (
                "b",
                int_column(&(0..num_rows).map(|v| (v % 3 != 0).then_some(v * 10)).collect::<Vec<_>>()),
            ),
        ],
    )
}

fn lazy_field(batch: &VectorRef, channel: usize) -> VectorRef {
    batch.as_row().unwrap().child_at(channel).unwrap().clone()
}

#[test]
fn test_projected_field_is_decoded_on_load() {
    let content = two_columns(6);
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let batch = next_batch(&mut reader, 6, None).unwrap();
    let mut b = lazy_field(&batch, 1);
    assert!(b.is_lazy());
    assert!(b.as_lazy().is_some_and(|lazy| !lazy.is_loaded()));
    assert_eq!(b.len(), 6);
    assert_eq!(reader.child(1).unwrap().read_offset(), 0);

    let loaded = ensure_loaded(&mut b, &mut reader).unwrap();
    assert_eq!(reader.child(1).unwrap().read_offset(), 6);
    assert!(loaded.is_null_at(0));
    assert_eq!(loaded.value_at(4), Value::Int64(40));
    // A second load does not touch the reader.
    let again = ensure_loaded(&mut b, &mut reader).unwrap();
    assert!(Arc::ptr_eq(&loaded, &again));
}

#[test]
fn test_stale_epoch_is_rejected() {
    let content = two_columns(12);
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let first = next_batch(&mut reader, 4, None).unwrap();
    let mut stale = lazy_field(&first, 0);
    let epoch = reader.epoch();
    next_batch(&mut reader, 4, None).unwrap();
    assert_eq!(reader.epoch(), epoch + 1);
    let err = ensure_loaded(&mut stale, &mut reader).unwrap_err();
    assert!(err.is_contract_violation());

    let second = next_batch(&mut reader, 2, None).unwrap();
    let mut stale = lazy_field(&second, 0);
    reader.seek_to(12).unwrap();
    assert_eq!(reader.child(0).unwrap().read_offset(), 12);
    let err = ensure_loaded(&mut stale, &mut reader).unwrap_err();
    assert!(err.is_contract_violation());
}

#[test]
fn test_lazy_vector_from_other_tree_is_rejected() {
    let content = two_columns(4);
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let mut other = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let batch = next_batch(&mut reader, 4, None).unwrap();
    next_batch(&mut other, 4, None).unwrap();
    let mut a = lazy_field(&batch, 0);
    let err = ensure_loaded(&mut a, &mut other).unwrap_err();
    assert!(err.is_contract_violation());
    assert_eq!(ensure_loaded(&mut a, &mut reader).unwrap().len(), 4);
}

#[test]
fn test_shared_placeholder_loads_once() {
    let content = two_columns(5);
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let batch = next_batch(&mut reader, 5, None).unwrap();
    let mut first = lazy_field(&batch, 1);
    let mut second = first.clone();
    let loaded = ensure_loaded(&mut first, &mut reader).unwrap();
    let reloaded = ensure_loaded(&mut second, &mut reader).unwrap();
    assert!(Arc::ptr_eq(&loaded, &reloaded));
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_unloaded_fields_catch_up_later() {
    let content = two_columns(12);
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    next_batch(&mut reader, 5, None).unwrap();
    let mut batch = next_batch(&mut reader, 4, None).unwrap();
    assert_eq!(reader.child(0).unwrap().read_offset(), 0);
    load_fields(&mut batch, &mut reader).unwrap();
    assert_eq!(field(&batch, 0).value_at(0), Value::Int64(5));
    let b = field(&batch, 1);
    assert!(b.is_null_at(1));
    assert_eq!(b.value_at(2), Value::Int64(70));
    assert_eq!(b.value_at(3), Value::Int64(80));
}

#[test]
fn test_lazy_matches_eager() {
    let mut rng = fastrand::Rng::with_seed(71);
    let content = generate_content(
        &mut rng,
        &nested_test_type(),
        400,
        FieldProperties::default(),
        true,
    );
    for layout in [NullLayout::ParentNullsOmitted, NullLayout::ParentNullsInLeaves] {
        let mut lazy = project_all_reader(&content, layout, ReaderConfig::default());
        let mut eager = project_all_reader(&content, layout, ReaderConfig::default().eager());
        let sizes = [1, 37, 100, 62, 200];
        let mut position = 0;
        for size in sizes {
            let mut lazy_batch = next_batch(&mut lazy, size, None).unwrap();
            let eager_batch = next_batch(&mut eager, size, None).unwrap();
            let row = lazy_batch.as_row().unwrap();
            let encodings = row.children().iter().flatten().map(|c| c.encoding()).collect_vec();
            assert!(encodings.iter().all(|&e| e == strata_vector::VectorEncoding::Lazy));
            assert!(eager_batch.as_row().unwrap().children().iter().flatten().all(|c| !c.is_lazy()));

            load_fields(&mut lazy_batch, &mut lazy).unwrap();
            let rows = (position..position + size).collect_vec();
            check_batch(&lazy_batch, &content, &rows);
            check_batch(&eager_batch, &content, &rows);
            position += size;
        }
    }
}

#[test]
fn test_extract_values_disables_deferral() {
    let content = two_columns(3);
    let spec = crate::scan_spec::ScanSpec::project_all("root", &content.data_type())
        .map_child("a", |a| a.with_extract_values(true));
    let mut reader = crate::tests::data_generator::build_reader(
        &content,
        NullLayout::ParentNullsOmitted,
        spec,
        ReaderConfig::default(),
    );
    let batch = next_batch(&mut reader, 3, None).unwrap();
    assert!(!field(&batch, 0).is_lazy());
    assert!(field(&batch, 1).is_lazy());
    assert!(matches!(field(&batch, 0), Vector::Flat(_)));
}

#[test]
fn test_lazy_struct_field_reuses_previous_container() {
    let mut rng = fastrand::Rng::with_seed(23);
    let content = generate_content(
        &mut rng,
        &nested_test_type(),
        40,
        FieldProperties::default(),
        true,
    );
    let mut reader = project_all_reader(&content, NullLayout::ParentNullsOmitted, ReaderConfig::default());
    let loaded_props = |batch: &VectorRef| {
        let lazy = batch.as_row().unwrap().child_at(2).unwrap().as_lazy().unwrap();
        Arc::as_ptr(lazy.loaded().unwrap())
    };

    let mut result = Some(Arc::new(Vector::empty_row(content.data_type())));
    reader.next(10, &mut result, None).unwrap();
    load_fields(result.as_mut().unwrap(), &mut reader).unwrap();
    let first = loaded_props(result.as_ref().unwrap());

    reader.next(10, &mut result, None).unwrap();
    load_fields(result.as_mut().unwrap(), &mut reader).unwrap();
    let batch = result.as_ref().unwrap();
    assert_eq!(loaded_props(batch), first);
    check_batch(batch, &content, &(10..20).collect_vec());

    // A loaded struct held elsewhere is left alone.
    let props = batch.as_row().unwrap().child_at(2).unwrap();
    let held = props.as_lazy().unwrap().loaded().unwrap().clone();
    reader.next(10, &mut result, None).unwrap();
    load_fields(result.as_mut().unwrap(), &mut reader).unwrap();
    let batch = result.as_ref().unwrap();
    assert_ne!(loaded_props(batch), Arc::as_ptr(&held));
    assert_eq!(held.len(), 10);
    check_batch(batch, &content, &(20..30).collect_vec());
}
