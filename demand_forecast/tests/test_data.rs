use chrono::{NaiveDate, NaiveDateTime};
use demand_forecast::data::{DailySeries, DataLoader};
use demand_forecast::error::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;

fn csv_bytes(rows: &str) -> Vec<u8> {
    format!("slot_start_time,demand\n{rows}").into_bytes()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn loads_records_with_passthrough_columns() {
    let csv = b"slot_start_time,demand,site\n\
        2024-01-01 00:30:00,12.5,north\n\
        2024-01-01 01:00:00,7.5,south\n"
        .to_vec();

    let records = DataLoader::from_csv_bytes(csv).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records.dataframe().width(), 3);
    assert_eq!(records.demand(), &[12.5, 7.5]);
    assert_eq!(
        records.timestamps()[0],
        "2024-01-01T00:30:00".parse::<NaiveDateTime>().unwrap()
    );
}

#[test]
fn loads_records_from_a_file_on_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"slot_start_time,demand\n2024-05-01 08:00:00,3.0\n")
        .unwrap();

    let records = DataLoader::from_csv_path(file.path()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records.demand(), &[3.0]);
}

#[test]
fn integer_demand_is_widened_to_f64() {
    let records = DataLoader::from_csv_bytes(csv_bytes(
        "2024-01-01 00:00:00,10\n2024-01-01 06:00:00,20\n",
    ))
    .unwrap();

    assert_eq!(records.demand(), &[10.0, 20.0]);
}

#[test]
fn missing_demand_column_is_a_data_error() {
    let csv = b"slot_start_time,volume\n2024-01-01 00:00:00,5.0\n".to_vec();
    let err = DataLoader::from_csv_bytes(csv).unwrap_err();

    assert!(matches!(err, ForecastError::DataError(_)));
    assert!(err.to_string().contains("demand"));
}

#[test]
fn missing_time_column_is_a_data_error() {
    let csv = b"start,demand\n2024-01-01 00:00:00,5.0\n".to_vec();
    let err = DataLoader::from_csv_bytes(csv).unwrap_err();

    assert!(matches!(err, ForecastError::DataError(_)));
    assert!(err.to_string().contains("slot_start_time"));
}

#[test]
fn non_numeric_demand_is_a_data_error() {
    let err = DataLoader::from_csv_bytes(csv_bytes("2024-01-01 00:00:00,lots\n")).unwrap_err();
    assert!(matches!(err, ForecastError::DataError(_)));
}

#[test]
fn unparseable_timestamp_is_a_data_error() {
    let err = DataLoader::from_csv_bytes(csv_bytes("soon,5.0\n")).unwrap_err();
    assert!(matches!(err, ForecastError::DataError(_)));
}

#[rstest]
#[case("2024-03-01 06:30:00", "2024-03-01T06:30:00")]
#[case("2024-03-01 06:30", "2024-03-01T06:30:00")]
#[case("2024-03-01T06:30:00", "2024-03-01T06:30:00")]
#[case("2024-03-01T06:30:00+00:00", "2024-03-01T06:30:00")]
#[case("03/01/2024 06:30", "2024-03-01T06:30:00")]
#[case("2024-03-01", "2024-03-01T00:00:00")]
fn accepts_common_timestamp_formats(#[case] raw: &str, #[case] expected: &str) {
    let records = DataLoader::from_csv_bytes(csv_bytes(&format!("{raw},1.0\n"))).unwrap();
    assert_eq!(
        records.timestamps()[0],
        expected.parse::<NaiveDateTime>().unwrap()
    );
}

#[test]
fn aggregates_demand_per_calendar_day() {
    let records = DataLoader::from_csv_bytes(csv_bytes(
        "2024-01-02 23:30:00,4.0\n\
         2024-01-01 00:30:00,1.0\n\
         2024-01-01 12:00:00,2.0\n\
         2024-01-02 00:00:00,3.0\n",
    ))
    .unwrap();

    let daily = DailySeries::from_records(&records);

    assert_eq!(daily.dates(), &[date(2024, 1, 1), date(2024, 1, 2)]);
    assert_eq!(daily.totals(), &[3.0, 7.0]);
    assert_eq!(daily.last_date(), Some(date(2024, 1, 2)));
}

#[test]
fn days_without_records_are_omitted() {
    let records = DataLoader::from_csv_bytes(csv_bytes(
        "2024-01-01 10:00:00,1.0\n2024-01-03 10:00:00,2.0\n",
    ))
    .unwrap();

    let daily = DailySeries::from_records(&records);

    assert_eq!(daily.dates(), &[date(2024, 1, 1), date(2024, 1, 3)]);
}

#[test]
fn rejects_out_of_order_dates() {
    let err = DailySeries::new(vec![date(2024, 1, 2), date(2024, 1, 1)], vec![1.0, 2.0])
        .unwrap_err();
    assert!(matches!(err, ForecastError::ValidationError(_)));
}

#[rstest]
#[case(40, 32)]
#[case(10, 8)]
#[case(5, 4)]
#[case(3, 2)]
fn train_split_floors_the_train_size(#[case] days: usize, #[case] expected_train: usize) {
    let dates: Vec<NaiveDate> = (0..days)
        .map(|offset| date(2024, 1, 1) + chrono::Duration::days(offset as i64))
        .collect();
    let totals: Vec<f64> = (0..days).map(|i| i as f64).collect();
    let series = DailySeries::new(dates, totals).unwrap();

    let (train, holdout) = series.train_split(0.8);

    assert_eq!(train.len(), expected_train);
    assert_eq!(holdout.len(), days - expected_train);
    assert_eq!(train.dates().last(), series.dates().get(expected_train - 1));
    assert_eq!(holdout.dates().first(), series.dates().get(expected_train));
}

#[test]
fn out_of_range_fraction_keeps_everything_in_train() {
    let series = DailySeries::new(
        vec![date(2024, 1, 1), date(2024, 1, 2)],
        vec![1.0, 2.0],
    )
    .unwrap();

    let (train, holdout) = series.train_split(1.5);

    assert_eq!(train.len(), 2);
    assert!(holdout.is_empty());
}
