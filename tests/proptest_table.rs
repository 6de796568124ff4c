//! Property-based tests for the table controller.
//!
//! Random datasets of (name, score) rows with duplicate keys and missing
//! values, checked against the ordering, filtering and selection rules.

use std::sync::Arc;

use proptest::prelude::*;
use tabula::dataset::Dataset;
use tabula::domain::SortCycle;
use tabula::schema::{ColumnDef, ColumnKind, Record, RecordId, Schema, Value};
use tabula::table::{SortDirection, TableController};

fn build(rows: Vec<(Option<String>, Option<i32>)>) -> Arc<Dataset> {
    let schema = Schema::new(vec![
        ColumnDef::text("name", "Name"),
        ColumnDef::numeric("score", "Score").not_exported(),
    ])
    .unwrap();
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, (name, score))| {
            Record::new(
                i + 1,
                vec![
                    name.map(Value::from).unwrap_or(Value::Null),
                    score.map(Value::from).unwrap_or(Value::Null),
                ],
            )
        })
        .collect();
    Arc::new(Dataset::new("random", schema, records).unwrap())
}

fn rows_strategy() -> impl Strategy<Value = Vec<(Option<String>, Option<i32>)>> {
    // Small alphabets and ranges so equal keys are common
    prop::collection::vec(
        (
            prop::option::weighted(0.9, "[aAbB]{0,3}"),
            prop::option::weighted(0.9, -3i32..4),
        ),
        0..40,
    )
}

fn ids(table: &TableController) -> Vec<RecordId> {
    table.visible_rows().map(|r| r.id.clone()).collect()
}

/// Position of a record in the dataset, ids are 1-based row numbers.
fn index(id: &RecordId) -> usize {
    id.as_str().parse().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn sort_is_ordered_stable_and_nulls_last(
        rows in rows_strategy(),
        field in prop::sample::select(vec!["name", "score"]),
        descending in any::<bool>(),
    ) {
        let dataset = build(rows);
        let mut table = TableController::new(Arc::clone(&dataset), SortCycle::Toggle);
        table.set_sort(field);
        if descending {
            table.set_sort(field);
        }

        let column = dataset.schema().position(field).unwrap();
        let kind = dataset.schema().columns()[column].kind;
        let visible: Vec<&Record> = table.visible_rows().collect();
        prop_assert_eq!(visible.len(), dataset.len());

        for pair in visible.windows(2) {
            let (a, b) = (pair[0].value(column), pair[1].value(column));
            prop_assert!(!a.is_null() || b.is_null(), "value after a missing value");
            let ord = match (a.is_null(), b.is_null()) {
                (false, true) => continue,
                (true, _) => std::cmp::Ordering::Equal,
                (false, false) if descending => kind.compare(a, b).reverse(),
                (false, false) => kind.compare(a, b),
            };
            prop_assert!(ord.is_le());
            if ord.is_eq() {
                prop_assert!(index(&pair[0].id) < index(&pair[1].id), "equal keys reordered");
            }
        }
    }

    #[test]
    fn filter_is_a_subsequence_of_matching_rows(
        rows in rows_strategy(),
        needle in "[abAB]{0,2}",
    ) {
        let dataset = build(rows);
        let mut table = TableController::new(Arc::clone(&dataset), SortCycle::Toggle);
        table.set_filter("name", &needle);
        table.apply_filters();

        let expected: Vec<RecordId> = dataset
            .records()
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || matches!(r.value(0), Value::Text(s) if s.to_lowercase().contains(&needle.to_lowercase()))
            })
            .map(|r| r.id.clone())
            .collect();
        prop_assert_eq!(ids(&table), expected);

        // Applying the same filters again changes nothing
        let before = ids(&table);
        table.apply_filters();
        prop_assert_eq!(ids(&table), before);
    }

    #[test]
    fn filter_and_sort_commute(
        rows in rows_strategy(),
        needle in "[ab]{1,2}",
    ) {
        let dataset = build(rows);
        let mut first = TableController::new(Arc::clone(&dataset), SortCycle::Toggle);
        first.set_sort("score");
        first.set_filter("name", &needle);
        first.apply_filters();

        let mut second = TableController::new(dataset, SortCycle::Toggle);
        second.set_filter("name", &needle);
        second.apply_filters();
        second.set_sort("score");

        prop_assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn sort_cycle_length(
        rows in rows_strategy(),
        tri_state in any::<bool>(),
    ) {
        let cycle = if tri_state { SortCycle::TriState } else { SortCycle::Toggle };
        let mut table = TableController::new(build(rows), cycle);
        let initial = table.sort_spec().clone();
        let period = if tri_state { 3 } else { 2 };

        table.set_sort("name");
        let first = table.sort_spec().clone();
        prop_assert_eq!(first.direction, SortDirection::Ascending);
        for _ in 0..period {
            table.set_sort("name");
        }
        prop_assert_eq!(table.sort_spec(), &first);

        if tri_state {
            table.set_sort("name");
            table.set_sort("name");
            prop_assert_eq!(table.sort_spec(), &initial);
        }
    }

    #[test]
    fn select_all_twice_clears_selection(
        rows in rows_strategy(),
        needle in "[ab]{0,1}",
    ) {
        let mut table = TableController::new(build(rows), SortCycle::Toggle);
        table.set_filter("name", &needle);
        table.apply_filters();

        table.toggle_select_all();
        prop_assert_eq!(table.selected_len(), table.visible_len());
        prop_assert_eq!(table.all_selected(), table.visible_len() > 0);
        let visible = ids(&table);
        for id in visible.iter() {
            prop_assert!(table.is_selected(id));
        }

        if table.visible_len() > 0 {
            table.toggle_select_all();
            prop_assert_eq!(table.selected_len(), 0);
        }
    }

    #[test]
    fn export_matches_visible_rows(
        rows in rows_strategy(),
        needle in "[ab]{0,1}",
    ) {
        let mut table = TableController::new(build(rows), SortCycle::Toggle);
        table.set_sort("name");
        table.set_filter("name", &needle);
        table.apply_filters();

        let export = table.export_rows();
        prop_assert_eq!(export.headers(), &["Name".to_string()]);
        prop_assert_eq!(export.rows().len(), table.visible_len());
        for (row, record) in export.rows().iter().zip(table.visible_rows()) {
            prop_assert_eq!(&row[0], record.value(0));
        }

        let csv = export.to_csv_string().unwrap();
        prop_assert_eq!(csv.lines().next(), Some("Name"));
    }

    #[test]
    fn collate_is_a_total_order(a in "[aAbB]{0,3}", b in "[aAbB]{0,3}") {
        let ab = ColumnKind::Text.compare(&Value::from(a.as_str()), &Value::from(b.as_str()));
        let ba = ColumnKind::Text.compare(&Value::from(b.as_str()), &Value::from(a.as_str()));
        prop_assert_eq!(ab, ba.reverse());
        prop_assert_eq!(ab.is_eq(), a == b);
    }
}
