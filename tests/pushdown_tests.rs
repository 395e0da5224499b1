//! Pushdown protocol checks: delegation, local fallback, contract
//! verification, and filter transposition across projections.

mod support;

use std::rc::Rc;

use support::{collect, measures_dataset, LyingDataset};
use vtl::prelude::*;
use vtl::script::operations::{
    DatasetOperation, FilterOperation, KeepOperation, OperationRef, RenameOperation,
    WrapperOperation,
};
use vtl::script::EngineConfig;

fn wide_dataset() -> InMemoryDataset {
    let structure = DataStructure::builder()
        .add(Component::identifier("id", DataType::Integer))
        .add(Component::measure("amount", DataType::Integer))
        .add(Component::attribute("note", DataType::String))
        .build()
        .unwrap();
    let rows = vec![
        DataPoint::new(vec![
            VtlValue::Integer(3),
            VtlValue::Integer(30),
            VtlValue::Str("c".into()),
        ]),
        DataPoint::new(vec![
            VtlValue::Integer(1),
            VtlValue::Integer(10),
            VtlValue::Str("a".into()),
        ]),
        DataPoint::new(vec![
            VtlValue::Integer(2),
            VtlValue::Integer(20),
            VtlValue::Str("b".into()),
        ]),
    ];
    InMemoryDataset::new(structure, rows).unwrap()
}

#[test]
fn declining_sources_are_sorted_and_filtered_locally() {
    let wrapper: OperationRef = Rc::new(WrapperOperation::new(Rc::new(
        wide_dataset().without_pushdown(),
    )));
    let keep = KeepOperation::new(wrapper, ["amount".to_string()].into()).unwrap();

    let stream = keep.compute_rows(
        &Ordering::ascending(["id"]),
        &Filtering::gt("amount", 10),
        &keep.structure().name_set(),
    );
    assert_eq!(
        collect(stream),
        [
            vec![VtlValue::Integer(2), VtlValue::Integer(20)],
            vec![VtlValue::Integer(3), VtlValue::Integer(30)],
        ]
    );
}

#[test]
fn verification_catches_sources_that_lie_about_sorting() {
    let lying = LyingDataset {
        inner: measures_dataset("amount", vec![(2, 20), (1, 10)]),
    };
    let config = EngineConfig {
        verify_sorted_inputs: true,
        ..EngineConfig::default()
    };
    let wrapper = WrapperOperation::with_config(Rc::new(lying), config);

    let results: Vec<Result<DataPoint>> = wrapper
        .compute_rows(
            &Ordering::ascending(["id"]),
            &Filtering::all(),
            &wrapper.structure().name_set(),
        )
        .collect();
    assert!(matches!(
        results.last(),
        Some(Err(VtlError::Precondition(_)))
    ));
}

#[test]
fn keep_retains_identifiers_through_the_whole_pipeline() {
    let wrapper: OperationRef = Rc::new(WrapperOperation::new(Rc::new(wide_dataset())));
    let keep = KeepOperation::new(wrapper, ["note".to_string()].into()).unwrap();

    let names: Vec<_> = keep.structure().names().collect();
    assert_eq!(names, ["id", "note"]);
    for row in keep.rows() {
        let row = row.unwrap();
        assert_eq!(row.len(), 2);
        assert!(!row.get(0).is_null());
    }
}

#[test]
fn filters_over_projected_away_columns_relax_but_stay_correct() {
    let wrapper: OperationRef = Rc::new(WrapperOperation::new(Rc::new(wide_dataset())));
    let keep: OperationRef =
        Rc::new(KeepOperation::new(wrapper, ["amount".to_string()].into()).unwrap());

    // The leaf over a column the child does not carry is neutralized; the
    // transposed filter must not reject rows the full filter would accept.
    let transposed = keep.required_filtering(&Filtering::and(vec![
        Filtering::gt("amount", 10),
        Filtering::eq("missing", 1),
    ]));
    let row = DataPoint::new(vec![VtlValue::Integer(1), VtlValue::Integer(20)]);
    assert!(transposed.test(&row, keep.structure()));
}

#[test]
fn renamed_requests_push_down_in_the_old_vocabulary() {
    let wrapper: OperationRef = Rc::new(WrapperOperation::new(Rc::new(wide_dataset())));
    let rename: OperationRef = Rc::new(
        RenameOperation::new(wrapper, [("amount".to_string(), "total".to_string())].into())
            .unwrap(),
    );
    let filter = FilterOperation::new(rename, Filtering::ge("total", 20)).unwrap();

    let stream = filter.compute_rows(
        &Ordering::ascending(["total"]),
        &Filtering::all(),
        &filter.structure().name_set(),
    );
    let totals: Vec<VtlValue> = collect(stream).into_iter().map(|row| row[1].clone()).collect();
    assert_eq!(totals, [VtlValue::Integer(20), VtlValue::Integer(30)]);
}
