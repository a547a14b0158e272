use crate::billing::{InputError, SubUnit, current_reading, prior_reading};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadingsError {
    #[error("could not open readings file")]
    Io(#[from] std::io::Error),
    #[error("readings file is not valid CSV")]
    Csv(#[from] csv::Error),
    #[error("unexpected headers in readings CSV: {found:?}, expected {expected:?}")]
    Headers {
        found: StringRecord,
        expected: StringRecord,
    },
    #[error("row {row}: expected 3 fields, found {found}")]
    Width { row: usize, found: usize },
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: InputError,
    },
}

static EXPECTED_HEADERS: LazyLock<StringRecord> =
    LazyLock::new(|| StringRecord::from(vec!["UNIT", "PRIOR", "CURRENT"]));

pub fn read_readings_file(path: &Path) -> Result<Vec<SubUnit>, ReadingsError> {
    read_readings(File::open(path)?)
}

/// Reads one sub-unit per row, in file order.
pub fn read_readings(source: impl Read) -> Result<Vec<SubUnit>, ReadingsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    let headers = csv_reader.headers()?.clone();
    if headers != *EXPECTED_HEADERS {
        return Err(ReadingsError::Headers {
            found: headers,
            expected: EXPECTED_HEADERS.clone(),
        });
    }
    csv_reader
        .into_records()
        .enumerate()
        .map(|(index, record)| {
            // Header is row 1.
            let row = index + 2;
            let record = record?;
            if record.len() != 3 {
                return Err(ReadingsError::Width {
                    row,
                    found: record.len(),
                });
            }
            parse_row(&record).map_err(|source| ReadingsError::Row { row, source })
        })
        .collect()
}

fn parse_row(record: &StringRecord) -> Result<SubUnit, InputError> {
    SubUnit::new(
        &record[0],
        prior_reading(&record[1])?,
        current_reading(&record[2])?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::io::Write;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn reads_units_in_order() {
        let csv = "UNIT,PRIOR,CURRENT\n\
                   Ground floor, 100.125, 130.250\n\
                   \"Flat 2, rear\",0,50\n";
        let units = read_readings(csv.as_bytes()).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "Ground floor");
        assert_eq!(units[0].measured_volume(), dec("30.125"));
        assert_eq!(units[1].name, "Flat 2, rear");
        assert_eq!(units[1].current_reading, dec("50"));
    }

    #[test]
    fn rejects_wrong_headers() {
        let err = read_readings("NAME,BEFORE,AFTER\nA,0,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReadingsError::Headers { .. }));
    }

    #[test]
    fn reports_row_of_bad_value() {
        let csv = "UNIT,PRIOR,CURRENT\nA,0,1\nB,zero,3\n";
        match read_readings(csv.as_bytes()).unwrap_err() {
            ReadingsError::Row { row, source } => {
                assert_eq!(row, 3);
                assert!(matches!(source, InputError::NotANumber { field: "prior reading", .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_and_short_rows() {
        let negative = "UNIT,PRIOR,CURRENT\nA,0,-1\n";
        assert!(matches!(
            read_readings(negative.as_bytes()).unwrap_err(),
            ReadingsError::Row {
                row: 2,
                source: InputError::Negative { .. }
            }
        ));
        let short = "UNIT,PRIOR,CURRENT\nA,0\n";
        assert!(matches!(
            read_readings(short.as_bytes()).unwrap_err(),
            ReadingsError::Width { row: 2, found: 2 }
        ));
    }

    #[test]
    fn rejects_exponent_readings() {
        let csv = "UNIT,PRIOR,CURRENT\nA,0,1e200000000\n";
        assert!(matches!(
            read_readings(csv.as_bytes()).unwrap_err(),
            ReadingsError::Row {
                row: 2,
                source: InputError::Exponent { .. }
            }
        ));
    }

    #[test]
    fn header_only_file_has_no_units() {
        assert!(read_readings("UNIT,PRIOR,CURRENT\n".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "UNIT,PRIOR,CURRENT").unwrap();
        writeln!(file, "Shop,12,20").unwrap();
        let units = read_readings_file(file.path()).unwrap();
        assert_eq!(units[0].measured_volume(), dec("8"));
    }
}
