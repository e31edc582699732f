use crate::net::{DataRate, DataRateError};
use crate::sim::SimTime;

#[test]
fn parses_common_rate_spellings() {
    assert_eq!("1000Mb/s".parse(), Ok(DataRate::from_mbps(1_000)));
    assert_eq!("100Gbps".parse(), Ok(DataRate::from_gbps(100)));
    assert_eq!("64kb/s".parse(), Ok(DataRate::from_bps(64_000)));
    assert_eq!("9600".parse(), Ok(DataRate::from_bps(9_600)));
    assert_eq!(" 1.5 Mb/s ".parse(), Ok(DataRate::from_bps(1_500_000)));
}

#[test]
fn rejects_malformed_rates() {
    assert_eq!("".parse::<DataRate>(), Err(DataRateError::Empty));
    assert!(matches!("Mb/s".parse::<DataRate>(), Err(DataRateError::Number(_))));
    assert!(matches!("10 furlongs".parse::<DataRate>(), Err(DataRateError::Unit(_))));
}

#[test]
fn display_uses_largest_exact_unit() {
    assert_eq!(DataRate::from_mbps(1_000).to_string(), "1Gb/s");
    assert_eq!(DataRate::from_mbps(800).to_string(), "800Mb/s");
    assert_eq!(DataRate::from_bps(1_500_000).to_string(), "1500kb/s");
    assert_eq!(DataRate::from_bps(7).to_string(), "7b/s");
}

#[test]
fn tx_time_is_bits_over_rate_rounded_to_nanos() {
    // 900B @ 1000Mb/s = 7.2us
    assert_eq!(DataRate::from_mbps(1_000).tx_time(900), SimTime(7_200));
    assert_eq!(DataRate::from_mbps(8).tx_time(1_000), SimTime::from_millis(1));
    // 1B @ 3b/s = 2.666..s
    assert_eq!(DataRate::from_bps(3).tx_time(1), SimTime(2_666_666_667));
    assert_eq!(DataRate::default().tx_time(1), SimTime::MAX);
}

#[test]
fn serde_uses_the_text_form() {
    let rate = DataRate::from_mbps(800);
    let json = serde_json::to_string(&rate).expect("serialize");
    assert_eq!(json, "\"800Mb/s\"");
    let back: DataRate = serde_json::from_str("\"100Gbps\"").expect("deserialize");
    assert_eq!(back, DataRate::from_gbps(100));
    assert!(serde_json::from_str::<DataRate>("\"fast\"").is_err());
}
