//! Partition rows by exact temperature.

use std::collections::HashMap;

use crate::domain::Row;

/// All rows sharing one exact temperature value, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureGroup {
    pub temperature: f64,
    pub rows: Vec<Row>,
}

/// Group rows by temperature, ascending.
///
/// Rows without a finite numeric `temperature` are left out. Keys use exact
/// numeric equality (no binning); `-0.0` and `0.0` land in the same group.
pub fn group_by_temperature(rows: &[Row]) -> Vec<TemperatureGroup> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<TemperatureGroup> = Vec::new();

    for row in rows {
        let Some(t) = row.temperature() else { continue };
        let t = t + 0.0;
        let slot = *index.entry(t.to_bits()).or_insert_with(|| {
            groups.push(TemperatureGroup {
                temperature: t,
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push(row.clone());
    }

    groups.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TEMPERATURE, TIME, Value};
    use proptest::prelude::*;

    fn row(time: f64, temperature: Option<Value>) -> Row {
        let mut r = Row::new();
        r.push(TIME, Value::Number(time));
        if let Some(t) = temperature {
            r.push(TEMPERATURE, t);
        }
        r
    }

    #[test]
    fn groups_are_sorted_and_keep_insertion_order() {
        let rows = vec![
            row(2.0, Some(Value::Number(30.0))),
            row(0.0, Some(Value::Number(20.0))),
            row(1.0, Some(Value::Number(30.0))),
            row(5.0, None),
            row(6.0, Some(Value::Text("warm".into()))),
            row(7.0, Some(Value::Number(-0.0))),
            row(8.0, Some(Value::Number(0.0))),
        ];

        let groups = group_by_temperature(&rows);
        let temps: Vec<f64> = groups.iter().map(|g| g.temperature).collect();
        assert_eq!(temps, vec![0.0, 20.0, 30.0]);

        let times_30: Vec<f64> = groups[2].rows.iter().filter_map(Row::time).collect();
        assert_eq!(times_30, vec![2.0, 1.0]);
        assert_eq!(groups[0].rows.len(), 2);
    }

    proptest! {
        #[test]
        fn groups_partition_rows_with_finite_temperature(
            temps in proptest::collection::vec(proptest::option::of(0u8..6), 0..60)
        ) {
            let rows: Vec<Row> = temps
                .iter()
                .enumerate()
                .map(|(i, t)| row(i as f64, t.map(|t| Value::Number(f64::from(t) * 5.0))))
                .collect();

            let groups = group_by_temperature(&rows);

            let eligible = temps.iter().filter(|t| t.is_some()).count();
            let grouped: usize = groups.iter().map(|g| g.rows.len()).sum();
            prop_assert_eq!(grouped, eligible);

            for pair in groups.windows(2) {
                prop_assert!(pair[0].temperature < pair[1].temperature);
            }

            // Each row (identified by its unique time) appears exactly once, in its own group.
            let mut seen: Vec<f64> = Vec::new();
            for g in &groups {
                for r in &g.rows {
                    prop_assert_eq!(r.temperature(), Some(g.temperature));
                    seen.push(r.time().unwrap());
                }
            }
            seen.sort_by(f64::total_cmp);
            seen.dedup();
            prop_assert_eq!(seen.len(), eligible);
        }
    }
}
