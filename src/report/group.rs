//! Partition filtered rows into report groups.

use std::collections::{BTreeMap, HashMap};

use crate::{
    models::{ChargeLine, ReportGroup},
    table::{Row, TagColumn},
};

/// Borrowed composite key of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    cluster_id: &'a str,
    cluster_name: &'a str,
    plan_type: &'a str,
    region: &'a str,
    start_date: &'a str,
    end_date: &'a str,
}

impl<'a> GroupKey<'a> {
    /// `None` when any key field is null.
    fn of(row: &'a Row) -> Option<Self> {
        Some(Self {
            cluster_id: row.cluster_id.as_deref()?,
            cluster_name: row.cluster_name.as_deref()?,
            plan_type: row.plan_type.as_deref()?,
            region: row.region.as_deref()?,
            start_date: row.start_date.as_deref()?,
            end_date: row.end_date.as_deref()?,
        })
    }

    fn into_group(self) -> ReportGroup {
        ReportGroup {
            subscription_id: self.cluster_id.to_string(),
            cluster_name: self.cluster_name.to_string(),
            plan_type: self.plan_type.to_string(),
            region: self.region.to_string(),
            start_date: self.start_date.to_string(),
            end_date: self.end_date.to_string(),
            charges: Vec::new(),
        }
    }
}

/// Build one charge line from a row, collecting its non-null tag cells.
pub fn charge_line(row: &Row, tag_columns: &[TagColumn<'_>]) -> ChargeLine {
    let tags: BTreeMap<String, String> = tag_columns
        .iter()
        .filter_map(|column| {
            column
                .value(row)
                .map(|value| (column.name.to_string(), value.to_string()))
        })
        .collect();

    ChargeLine {
        charge_type: row.charge_type.clone(),
        billing_unit_type: row.billing_unit_type.clone(),
        quantity: row.quantity,
        price_per_hour: row.price_per_hour,
        hours: row.hours,
        subtotal: row.subtotal,
        discount: row.discount,
        total_cost: row.total_cost,
        tags: (!tags.is_empty()).then_some(tags),
    }
}

/// Group rows by (cluster id, cluster name, plan type, region, start date,
/// end date).
///
/// Groups come out in order of first appearance; each group keeps one charge
/// line per row in row order, duplicates included. Rows with a null key field
/// belong to no group.
pub fn group(rows: &[&Row], tag_columns: &[TagColumn<'_>]) -> Vec<ReportGroup> {
    let mut index: HashMap<GroupKey<'_>, usize> = HashMap::new();
    let mut groups: Vec<ReportGroup> = Vec::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some(key) = GroupKey::of(row) else {
            skipped += 1;
            continue;
        };
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(key.into_group());
            groups.len() - 1
        });
        groups[slot].charges.push(charge_line(row, tag_columns));
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Rows with a null group key left out of the report");
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    const CSV: &str = "\
Cluster id,Cluster name,Plan Type,Region,Start date,End date,Charge Type,Hours,Total Cost $,key1:value,owner,key2:value
1,alpha,Pro,us,2024-01-01,2024-01-31,compute,720,10,team-a,ops,prod
2,beta,Pro,us,2024-02-01,2024-02-29,compute,1,2,,,
1,alpha,Pro,us,2024-01-01,2024-01-31,compute,720,10,,,staging
1,alpha,Pro,eu,2024-01-01,2024-01-31,storage,5,1,,,
3,,Pro,us,2024-01-01,2024-01-31,compute,1,1,,,
";

    fn grouped() -> Vec<ReportGroup> {
        let table = Table::from_reader(CSV.as_bytes()).unwrap();
        let rows: Vec<&Row> = table.rows().iter().collect();
        group(&rows, &table.tag_columns())
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let groups = grouped();

        let keys: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.subscription_id.as_str(), g.region.as_str()))
            .collect();
        assert_eq!(keys, vec![("1", "us"), ("2", "us"), ("1", "eu")]);
    }

    #[test]
    fn test_duplicate_charges_kept_in_row_order() {
        let groups = grouped();

        let first = &groups[0];
        assert_eq!(first.charges.len(), 2);
        assert_eq!(first.charges[0].charge_type.as_deref(), Some("compute"));
        assert_eq!(first.charges[1].charge_type.as_deref(), Some("compute"));
        assert_eq!(
            first.charges[1].tags,
            Some(BTreeMap::from([(
                "key2:value".to_string(),
                "staging".to_string()
            )]))
        );
    }

    #[test]
    fn test_tags_hold_only_non_null_tag_columns() {
        let groups = grouped();

        assert_eq!(
            groups[0].charges[0].tags,
            Some(BTreeMap::from([
                ("key1:value".to_string(), "team-a".to_string()),
                ("key2:value".to_string(), "prod".to_string()),
            ]))
        );
        assert_eq!(groups[1].charges[0].tags, None);
    }

    #[test]
    fn test_null_key_rows_skipped() {
        let groups = grouped();
        assert!(groups.iter().all(|g| g.subscription_id != "3"));
        let charges: usize = groups.iter().map(|g| g.charges.len()).sum();
        assert_eq!(charges, 4);
    }

    #[test]
    fn test_empty_input() {
        assert!(group(&[], &[]).is_empty());
    }
}
