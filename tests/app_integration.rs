use pundi::core::investment::{
    Asset, DepositHolding, InterestPayout, MarketHolding, PriceStatus, Tenor,
};
use pundi::store::snapshot::SnapshotStore;
use pundi::{AppCommand, run_command};
use std::fs;
use tracing::info;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_yahoo_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_indodax_mock_server(pair: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let url_path = format!("/api/ticker/{pair}");

        Mock::given(method("GET"))
            .and(path(&url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(
    dir: &tempfile::TempDir,
    yahoo_url: &str,
    indodax_url: &str,
    sync_url: Option<&str>,
) -> std::path::PathBuf {
    let config_path = dir.path().join("config.yaml");
    let data_path = dir.path().join("data");
    let sync_section = sync_url.map_or(String::new(), |url| {
        format!("sync:\n  base_url: \"{url}\"\n")
    });
    let config_content = format!(
        r#"
providers:
  yahoo:
    base_url: "{yahoo_url}"
  indodax:
    base_url: "{indodax_url}"
{sync_section}currency: "IDR"
data_path: "{}"
"#,
        data_path.display()
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");
    config_path
}

// Open, read and release the snapshot so the next run_command can take
// the keyspace lock again.
fn load_records(dir: &tempfile::TempDir) -> Vec<pundi::core::investment::Investment> {
    let snapshot = SnapshotStore::open(&dir.path().join("data")).unwrap();
    snapshot.load().unwrap().unwrap_or_default()
}

fn stock(symbol: &str, buy_price: f64, quantity: f64) -> Asset {
    Asset::Stock(MarketHolding {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        buy_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        buy_price,
        quantity,
        current_price: None,
    })
}

#[test_log::test(tokio::test)]
async fn test_add_stock_settles_quote_and_persists() {
    let mock_response = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "regularMarketPrice": 9500.0,
                    "currency": "IDR"
                }
            }]
        }
    }"#;
    let yahoo = test_utils::create_yahoo_mock_server("BBCA.JK", mock_response).await;
    let indodax = test_utils::create_indodax_mock_server("btcidr", "{}").await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &yahoo.uri(), &indodax.uri(), None);

    let result = run_command(
        AppCommand::Add {
            asset: stock("BBCA", 9000.0, 100.0),
            notes: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());

    // The snapshot on disk carries the settled quote.
    let records = load_records(&dir);
    assert_eq!(records.len(), 1);
    info!(?records, "Persisted records after add");
    assert_eq!(records[0].price_status, PriceStatus::Updated);
    assert_eq!(records[0].current_value, 950_000.0);

    // A follow-up summary over the same config succeeds.
    let result = run_command(AppCommand::Summary, Some(config_path.to_str().unwrap())).await;
    assert!(result.is_ok(), "Summary failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_add_crypto_uses_indodax_ticker() {
    let mock_response = r#"{"ticker": {"last": "951250000"}}"#;
    let indodax = test_utils::create_indodax_mock_server("btcidr", mock_response).await;
    let yahoo = test_utils::create_yahoo_mock_server("UNUSED.JK", "{}").await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(&dir, &yahoo.uri(), &indodax.uri(), None);

    let result = run_command(
        AppCommand::Add {
            asset: Asset::Crypto(MarketHolding {
                symbol: "BTC".to_string(),
                name: "Bitcoin".to_string(),
                buy_date: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                buy_price: 900_000_000.0,
                quantity: 0.01,
                current_price: None,
            }),
            notes: Some("DCA".to_string()),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());

    let records = load_records(&dir);
    assert_eq!(records[0].price_status, PriceStatus::Updated);
    assert_eq!(records[0].current_value, 951_250_000.0 * 0.01);
}

#[test_log::test(tokio::test)]
async fn test_unreachable_quote_venue_marks_failed_but_keeps_record() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    // Nothing listens on these ports; every fetch errors.
    let config_path = write_config(
        &dir,
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        None,
    );

    let result = run_command(
        AppCommand::Add {
            asset: stock("BBCA", 9000.0, 100.0),
            notes: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    // The quote failure never aborts the user-visible mutation.
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());

    let records = load_records(&dir);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price_status, PriceStatus::Failed);
    // Valuation falls back to cost basis.
    assert_eq!(records[0].current_value, 900_000.0);
}

#[test_log::test(tokio::test)]
async fn test_deposito_lifecycle_without_network() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(&dir, "http://127.0.0.1:9", "http://127.0.0.1:9", None);
    let config = config_path.to_str().unwrap();

    let deposit = Asset::Deposito(DepositHolding {
        bank_name: "BCA".to_string(),
        principal: 2_000_000.0,
        tenor: Tenor::ThreeMonths,
        annual_rate: 8.0,
        payout: InterestPayout::Maturity,
        tax_rate: 20.0,
        start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        auto_rollover: false,
    });

    run_command(
        AppCommand::Add {
            asset: deposit,
            notes: None,
        },
        Some(config),
    )
    .await
    .expect("Add failed");

    let records = load_records(&dir);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price_status, PriceStatus::Static);
    // 2,000,000 + 2,000,000 * 8% * 1/4
    assert_eq!(records[0].current_value, 2_040_000.0);
    let id = records[0].id.clone();

    // Static records never hit the network, so list/summary work offline.
    run_command(AppCommand::Summary, Some(config))
        .await
        .expect("Summary failed");

    run_command(AppCommand::Remove { id }, Some(config))
        .await
        .expect("Remove failed");
    assert!(load_records(&dir).is_empty());
}

#[test_log::test(tokio::test)]
async fn test_sync_pushes_record_to_remote() {
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let remote = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/investments/[0-9a-f-]+$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1..)
        .mount(&remote)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        Some(&remote.uri()),
    );

    run_command(
        AppCommand::Add {
            asset: Asset::Deposito(DepositHolding {
                bank_name: "Mandiri".to_string(),
                principal: 1_000_000.0,
                tenor: Tenor::TwelveMonths,
                annual_rate: 5.0,
                payout: InterestPayout::Maturity,
                tax_rate: 20.0,
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                auto_rollover: true,
            }),
            notes: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await
    .expect("Add failed");

    let records = load_records(&dir);
    assert!(records[0].synced, "record should be marked synced");
    assert!(records[0].synced_at.is_some());
}

#[test_log::test(tokio::test)]
async fn test_pull_replaces_local_collection() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let cloud_record = pundi::core::investment::Investment::new(stock("BBRI", 5000.0, 200.0), None);
    let remote = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/investments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![cloud_record.clone()]))
        .mount(&remote)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&remote)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_config(
        &dir,
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        Some(&remote.uri()),
    );
    let config = config_path.to_str().unwrap();

    // Seed a local record that the pull will replace.
    run_command(
        AppCommand::Add {
            asset: Asset::Deposito(DepositHolding {
                bank_name: "Local Bank".to_string(),
                principal: 500_000.0,
                tenor: Tenor::OneMonth,
                annual_rate: 4.0,
                payout: InterestPayout::Maturity,
                tax_rate: 20.0,
                start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                auto_rollover: false,
            }),
            notes: None,
        },
        Some(config),
    )
    .await
    .expect("Add failed");

    run_command(AppCommand::Pull, Some(config))
        .await
        .expect("Pull failed");

    let records = load_records(&dir);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, cloud_record.id);
    assert!(records[0].synced);
}

#[test_log::test(tokio::test)]
#[ignore = "hits the live Yahoo Finance API"]
async fn test_real_yahoo_finance_api() {
    use pundi::core::cache::Cache;
    use pundi::core::price::PriceProvider;
    use pundi::providers::yahoo_finance::YahooFinanceProvider;

    let base_url = "https://query1.finance.yahoo.com";
    let cache = std::sync::Arc::new(Cache::new());
    let provider = YahooFinanceProvider::new(base_url, cache);

    let symbol = "BBCA";
    info!(?symbol, "Fetching price from Yahoo Finance");

    let price = provider
        .fetch_price(symbol)
        .await
        .expect("API request failed")
        .expect("No quote for symbol");
    assert!(price > 0.0, "Price should be positive");
    info!("Real API Response - {}: {}", symbol, price);
}

#[test_log::test(tokio::test)]
#[ignore = "hits the live Indodax API"]
async fn test_real_indodax_api() {
    use pundi::core::cache::Cache;
    use pundi::core::price::PriceProvider;
    use pundi::providers::indodax::IndodaxProvider;

    let base_url = "https://indodax.com";
    let cache = std::sync::Arc::new(Cache::new());
    let provider = IndodaxProvider::new(base_url, cache);

    let symbol = "BTC";
    info!(?symbol, "Fetching price from Indodax");

    let price = provider
        .fetch_price(symbol)
        .await
        .expect("API request failed")
        .expect("No quote for symbol");
    assert!(price > 0.0, "Price should be positive");
    info!("Real API Response - {}: {}", symbol, price);
}
