use std::{fs::File, io::Read, path::Path};

use csv::StringRecord;

use super::{LoadError, Row, Table, columns};

/// Cell spellings read as null. Compared after trimming.
const NULL_TOKENS: [&str; 9] = ["", "NA", "N/A", "n/a", "#N/A", "NULL", "null", "None", "<NA>"];

fn is_null(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell.trim())
}

/// Normalize an id cell to its text form.
///
/// Ids are numeric-looking but compared as text, so a float spelling of an
/// integral id (`"123.0"`) collapses to `"123"`.
pub(crate) fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('.')
        && let Ok(value) = trimmed.parse::<f64>()
        && value.is_finite()
        && value.fract() == 0.0
        && value.abs() < 9_007_199_254_740_992.0
    {
        return format!("{}", value as i64);
    }
    trimmed.to_string()
}

/// Header positions of the fixed columns.
struct ColumnIndex {
    cluster_id: usize,
    cluster_name: usize,
    plan_type: usize,
    region: usize,
    start_date: usize,
    end_date: usize,
    database_id: Option<usize>,
    charge_type: Option<usize>,
    billing_unit_type: Option<usize>,
    quantity: Option<usize>,
    price_per_hour: Option<usize>,
    hours: Option<usize>,
    subtotal: Option<usize>,
    discount: Option<usize>,
    total_cost: Option<usize>,
    dynamic: Vec<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require =
            |name: &str| find(name).ok_or_else(|| LoadError::MissingColumn(name.to_string()));

        Ok(Self {
            cluster_id: require(columns::CLUSTER_ID)?,
            cluster_name: require(columns::CLUSTER_NAME)?,
            plan_type: require(columns::PLAN_TYPE)?,
            region: require(columns::REGION)?,
            start_date: require(columns::START_DATE)?,
            end_date: require(columns::END_DATE)?,
            database_id: find(columns::DATABASE_ID),
            charge_type: find(columns::CHARGE_TYPE),
            billing_unit_type: find(columns::BILLING_UNIT_TYPE),
            quantity: find(columns::QUANTITY),
            price_per_hour: find(columns::PRICE_PER_HOUR),
            hours: find(columns::HOURS),
            subtotal: find(columns::SUBTOTAL),
            discount: find(columns::DISCOUNT),
            total_cost: find(columns::TOTAL_COST),
            dynamic: headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !columns::is_fixed(h))
                .map(|(i, _)| i)
                .collect(),
        })
    }
}

/// Reads typed cells out of one CSV record.
struct RecordReader<'a> {
    record: &'a StringRecord,
    line: u64,
}

impl RecordReader<'_> {
    fn text(&self, index: usize) -> Option<String> {
        let cell = self.record.get(index)?;
        (!is_null(cell)).then(|| cell.to_string())
    }

    fn optional_text(&self, index: Option<usize>) -> Option<String> {
        index.and_then(|i| self.text(i))
    }

    fn number(&self, index: Option<usize>, column: &str) -> Result<Option<f64>, LoadError> {
        let Some(cell) = index.and_then(|i| self.record.get(i)) else {
            return Ok(None);
        };
        if is_null(cell) {
            return Ok(None);
        }
        cell.trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| LoadError::InvalidNumber {
                line: self.line,
                column: column.to_string(),
                value: cell.to_string(),
            })
    }
}

impl Table {
    /// Load the dataset from a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse CSV data with a header row.
    ///
    /// Every record must have as many fields as the header. The six group
    /// key columns are required; the other fixed columns are optional and
    /// read as null when absent.
    pub fn from_reader(reader: impl Read) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let index = ColumnIndex::from_headers(&headers)?;

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let cells = RecordReader {
                record: &record,
                line: record.position().map_or(0, |p| p.line()),
            };

            rows.push(Row {
                cluster_id: cells.text(index.cluster_id).map(|id| normalize_id(&id)),
                cluster_name: cells.text(index.cluster_name),
                plan_type: cells.text(index.plan_type),
                region: cells.text(index.region),
                start_date: cells.text(index.start_date),
                end_date: cells.text(index.end_date),
                database_id: cells.optional_text(index.database_id),
                charge_type: cells.optional_text(index.charge_type),
                billing_unit_type: cells.optional_text(index.billing_unit_type),
                quantity: cells.number(index.quantity, columns::QUANTITY)?,
                price_per_hour: cells.number(index.price_per_hour, columns::PRICE_PER_HOUR)?,
                hours: cells.number(index.hours, columns::HOURS)?,
                subtotal: cells.number(index.subtotal, columns::SUBTOTAL)?,
                discount: cells.number(index.discount, columns::DISCOUNT)?,
                total_cost: cells.number(index.total_cost, columns::TOTAL_COST)?,
                dynamic: index.dynamic.iter().map(|&i| cells.text(i)).collect(),
            });
        }

        Ok(Table {
            columns: headers.iter().map(String::from).collect(),
            dynamic_columns: index.dynamic.iter().map(|&i| headers[i].to_string()).collect(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const HEADER: &str = "Cluster id,Cluster name,Plan Type,Region,Start date,End date,Database id,Charge Type,Billing Unit Type,Billing Unit quantity,Billing Unit price/hr,Hours,Subtotal,Discount,Total Cost $,key1:value";

    fn load(body: &str) -> Result<Table, LoadError> {
        Table::from_reader(format!("{HEADER}\n{body}").as_bytes())
    }

    #[test]
    fn test_full_row_parsed() {
        let table = load(
            "12345,prod-db,Pro,us-east-1,2024-03-01,2024-03-31,100.0,Compute,Shard,2,0.5,720,720,-20,700,team:core\n",
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.cluster_id.as_deref(), Some("12345"));
        assert_eq!(row.cluster_name.as_deref(), Some("prod-db"));
        assert_eq!(row.plan_type.as_deref(), Some("Pro"));
        assert_eq!(row.start_date.as_deref(), Some("2024-03-01"));
        assert_eq!(row.database_id_value(), Some(100.0));
        assert_eq!(row.charge_type.as_deref(), Some("Compute"));
        assert_eq!(row.quantity, Some(2.0));
        assert_eq!(row.price_per_hour, Some(0.5));
        assert_eq!(row.discount, Some(-20.0));
        assert_eq!(row.total_cost, Some(700.0));
        assert_eq!(row.dynamic_cell(0), Some("team:core"));
    }

    #[test]
    fn test_null_cells_read_as_none() {
        let table = load("1,a,Pro,eu,2024-01-01,2024-01-31,N/A,,NA,,,,,,,\n").unwrap();
        let row = &table.rows()[0];

        assert_eq!(row.database_id, None);
        assert_eq!(row.charge_type, None);
        assert_eq!(row.billing_unit_type, None);
        assert_eq!(row.quantity, None);
        assert_eq!(row.total_cost, None);
        assert_eq!(row.dynamic_cell(0), None);
    }

    #[test]
    fn test_non_finite_numbers_kept() {
        let table = load("1,a,Pro,eu,2024-01-01,2024-01-31,,,,inf,-inf,NaN,,,,\n").unwrap();
        let row = &table.rows()[0];

        assert_eq!(row.quantity, Some(f64::INFINITY));
        assert_eq!(row.price_per_hour, Some(f64::NEG_INFINITY));
        assert!(row.hours.is_some_and(f64::is_nan));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = load("1,a,Pro,eu,2024-01-01,2024-01-31,,,,two,,,,,,\n").unwrap_err();

        match err {
            LoadError::InvalidNumber {
                line,
                column,
                value,
            } => {
                assert_eq!(line, 2);
                assert_eq!(column, columns::QUANTITY);
                assert_eq!(value, "two");
            }
            other => panic!("expected InvalidNumber, got {other}"),
        }
    }

    #[test]
    fn test_missing_key_column_rejected() {
        let err = Table::from_reader("Cluster id,Cluster name,Plan Type,Region,Start date\n1,a,Pro,eu,2024-01-01\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == columns::END_DATE));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = Table::from_reader("".as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(_)));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let err = load("1,a,Pro,eu,2024-01-01\n").unwrap_err();
        assert!(matches!(err, LoadError::Csv(_)));
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let table = Table::from_reader(
            "Region,Cluster id,Cluster name,Plan Type,Start date,End date\neu,7,a,Free,2024-01-01,2024-01-31\n"
                .as_bytes(),
        )
        .unwrap();

        let row = &table.rows()[0];
        assert_eq!(row.cluster_id.as_deref(), Some("7"));
        assert_eq!(row.region.as_deref(), Some("eu"));
        assert_eq!(row.total_cost, None);
        assert!(table.dynamic_columns().is_empty());
    }

    #[rstest]
    #[case("123", "123")]
    #[case("123.0", "123")]
    #[case(" 42 ", "42")]
    #[case("12.5", "12.5")]
    #[case("abc", "abc")]
    fn test_normalize_id(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_id(raw), expected);
    }
}
