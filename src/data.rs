//! Year-indexed historical data handling

use crate::error::{ForecastError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Annually indexed table of named numeric series.
///
/// Years are kept strictly increasing; cells that were empty in the source
/// data are stored as `NAN`. This is the shared shape for both the historical
/// macro-fiscal dataset and the future explanatory scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualTable {
    years: Vec<i32>,
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

impl AnnualTable {
    /// Create an empty table with the given column names.
    pub fn new(names: Vec<String>) -> Self {
        let columns = names.iter().map(|n| (n.clone(), Vec::new())).collect();
        Self {
            years: Vec::new(),
            names,
            columns,
        }
    }

    /// Create a table from parallel column vectors.
    pub fn from_columns(years: Vec<i32>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        for (name, values) in &columns {
            if values.len() != years.len() {
                return Err(ForecastError::DataError(format!(
                    "Column '{}' has {} values for {} years",
                    name,
                    values.len(),
                    years.len()
                )));
            }
        }
        if years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(
                "Years must be strictly increasing".to_string(),
            ));
        }

        let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
        let columns = columns.into_iter().collect();
        Ok(Self {
            years,
            names,
            columns,
        })
    }

    /// Load an annual table from a CSV file.
    ///
    /// The first column is the fiscal year; remaining columns are numeric
    /// series. Empty cells become `NAN`. Rows are re-sorted by year.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(ForecastError::DataError(
                "CSV must have a year column and at least one data column".to_string(),
            ));
        }
        let names: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();

        let mut rows: Vec<(i32, Vec<f64>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let year_field = record.get(0).unwrap_or("");
            // Accept both bare years and period-style labels like "2020A".
            let digits: String = year_field.chars().filter(|c| c.is_ascii_digit()).collect();
            let year: i32 = digits.parse().map_err(|_| {
                ForecastError::DataError(format!("Unparseable year '{}'", year_field))
            })?;

            let mut values = Vec::with_capacity(names.len());
            for i in 1..headers.len() {
                let cell = record.get(i).unwrap_or("").trim();
                if cell.is_empty() {
                    values.push(f64::NAN);
                } else {
                    let v: f64 = cell.parse().map_err(|_| {
                        ForecastError::DataError(format!(
                            "Unparseable value '{}' in column '{}'",
                            cell,
                            names[i - 1]
                        ))
                    })?;
                    values.push(v);
                }
            }
            rows.push((year, values));
        }

        rows.sort_by_key(|(year, _)| *year);
        if rows.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::DataError(
                "Duplicate year in CSV data".to_string(),
            ));
        }

        let years: Vec<i32> = rows.iter().map(|(y, _)| *y).collect();
        let mut columns: HashMap<String, Vec<f64>> = names
            .iter()
            .map(|n| (n.clone(), Vec::with_capacity(rows.len())))
            .collect();
        for (_, values) in &rows {
            for (name, &value) in names.iter().zip(values.iter()) {
                columns.get_mut(name).expect("column exists").push(value);
            }
        }

        Ok(Self {
            years,
            names,
            columns,
        })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Fiscal years, in order
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Last fiscal year in the table
    pub fn last_year(&self) -> Option<i32> {
        self.years.last().copied()
    }

    /// Column names, in order
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// A full column by name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    /// A single cell by row index and column name
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.get(row)).copied()
    }

    /// The last value of a column
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.columns.get(name).and_then(|v| v.last()).copied()
    }

    /// Append a validated row.
    ///
    /// Every existing column must either be supplied in `values` or be
    /// defaultable from the previous row; a column that is neither is a fatal
    /// error. Names in `values` that are not table columns are ignored. Rows
    /// are re-sorted by year after insertion and duplicate years rejected.
    pub fn push_row(&mut self, year: i32, values: &HashMap<String, f64>) -> Result<()> {
        if self.years.contains(&year) {
            return Err(ForecastError::DataError(format!(
                "Year {} already present in table",
                year
            )));
        }

        let mut row: Vec<f64> = Vec::with_capacity(self.names.len());
        for name in &self.names {
            match values.get(name) {
                Some(&v) => row.push(v),
                None => match self.last_value(name) {
                    Some(v) => row.push(v),
                    None => {
                        return Err(ForecastError::DataError(format!(
                            "Missing required field '{}' with no defaultable value",
                            name
                        )));
                    }
                },
            }
        }

        // Insert keeping years strictly increasing.
        let pos = self.years.partition_point(|&y| y < year);
        self.years.insert(pos, year);
        for (name, value) in self.names.iter().zip(row.into_iter()) {
            self.columns
                .get_mut(name)
                .expect("column exists")
                .insert(pos, value);
        }
        Ok(())
    }

    /// Index of a year, if present
    pub fn year_index(&self, year: i32) -> Option<usize> {
        self.years.iter().position(|&y| y == year)
    }

    /// Serialize the table to a CSV string with a `year` header column.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["year".to_string()];
        header.extend(self.names.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| ForecastError::CsvError(e.to_string()))?;

        for (row, &year) in self.years.iter().enumerate() {
            let mut record = vec![year.to_string()];
            for name in &self.names {
                let v = self.value(row, name).unwrap_or(f64::NAN);
                if v.is_nan() {
                    record.push(String::new());
                } else {
                    record.push(format!("{}", v));
                }
            }
            writer
                .write_record(&record)
                .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ForecastError::CsvError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> AnnualTable {
        AnnualTable::from_columns(
            vec![2020, 2021, 2022],
            vec![
                ("log_gst".to_string(), vec![1.0, 1.1, 1.2]),
                ("inflation".to_string(), vec![8.0, 9.0, 10.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_columns_rejects_unsorted_years() {
        let result = AnnualTable::from_columns(
            vec![2021, 2020],
            vec![("a".to_string(), vec![1.0, 2.0])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn push_row_defaults_missing_fields_from_last_row() {
        let mut table = small_table();
        let mut values = HashMap::new();
        values.insert("log_gst".to_string(), 1.3);
        table.push_row(2023, &values).unwrap();

        assert_eq!(table.last_year(), Some(2023));
        assert_eq!(table.last_value("log_gst"), Some(1.3));
        // inflation defaulted from 2022
        assert_eq!(table.last_value("inflation"), Some(10.0));
    }

    #[test]
    fn push_row_keeps_years_sorted() {
        let mut table = small_table();
        let mut values = HashMap::new();
        values.insert("log_gst".to_string(), 0.9);
        values.insert("inflation".to_string(), 7.0);
        table.push_row(2019, &values).unwrap();

        assert_eq!(table.years(), &[2019, 2020, 2021, 2022]);
        assert_eq!(table.value(0, "log_gst"), Some(0.9));
    }

    #[test]
    fn push_row_rejects_duplicate_year() {
        let mut table = small_table();
        let values = HashMap::new();
        assert!(table.push_row(2021, &values).is_err());
    }

    #[test]
    fn push_row_into_empty_table_requires_all_fields() {
        let mut table = AnnualTable::new(vec!["a".to_string()]);
        let values = HashMap::new();
        assert!(table.push_row(2020, &values).is_err());
    }
}
