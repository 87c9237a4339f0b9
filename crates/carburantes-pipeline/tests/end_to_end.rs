//! End-to-end runs against a scripted upstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use carburantes_fetch::{
    ClientConfig, FetchScheduler, RawResponse, ThrottleConfig, Transport, TransportError,
    TransportErrorKind,
};
use carburantes_format::{FileTableWriter, FormatError, OutputFormat, TableWriter, WrittenTable};
use carburantes_fuels::FuelSelection;
use carburantes_pipeline::{Pipeline, RunSummary, ShutdownCoordinator};
use carburantes_types::{DateKey, DateRange, Outcome, OutcomeStatus, StationTable};
use serde_json::json;

const BASE: &str = "http://upstream.test/EstacionesTerrestresHist";

/// Answers by date; unknown dates get an empty station list.
///
/// A date answers its scripted replies in order and keeps repeating the last.
#[derive(Clone, Default)]
struct Upstream {
    responses: HashMap<String, Vec<Result<RawResponse, TransportError>>>,
    calls: Arc<Mutex<HashMap<String, u32>>>,
    total: Arc<AtomicU32>,
}

impl Upstream {
    fn respond(self, date: &str, status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.then(date, Ok(RawResponse::new(status, body)))
    }

    fn fail(self, date: &str) -> Self {
        self.then(date, Err(refused()))
    }

    fn then(mut self, date: &str, reply: Result<RawResponse, TransportError>) -> Self {
        self.responses
            .entry(format!("{BASE}/{date}"))
            .or_default()
            .push(reply);
        self
    }

    fn calls_for(&self, date: &str) -> u32 {
        let calls = self.calls.lock().unwrap();
        calls.get(&format!("{BASE}/{date}")).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for Upstream {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_default();
            *count += 1;
            *count as usize
        };
        match self.responses.get(url) {
            Some(replies) => replies[(call - 1).min(replies.len() - 1)].clone(),
            None => Ok(RawResponse::new(200, r#"{"ListaEESSPrecio":[]}"#)),
        }
    }
}

fn refused() -> TransportError {
    TransportError::new(TransportErrorKind::Connect, "connection refused")
}

/// Holds every call until released, then answers 503.
#[derive(Clone, Default)]
struct Gated {
    release: Arc<Notify>,
    total: Arc<AtomicU32>,
}

#[async_trait]
impl Transport for Gated {
    async fn get(&self, _url: &str) -> Result<RawResponse, TransportError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(RawResponse::new(503, "Service Unavailable"))
    }
}

/// Keeps written tables in memory.
#[derive(Clone, Default)]
struct MemoryWriter {
    tables: Arc<Mutex<Vec<StationTable>>>,
}

impl TableWriter for MemoryWriter {
    fn write(&self, table: &StationTable) -> Result<WrittenTable, FormatError> {
        self.tables.lock().unwrap().push(table.clone());
        Ok(WrittenTable {
            name: format!("precios_{}.csv", table.date().file_stem()),
            size_bytes: 100 * table.row_count() as u64,
        })
    }
}

struct BrokenWriter;

impl TableWriter for BrokenWriter {
    fn write(&self, _table: &StationTable) -> Result<WrittenTable, FormatError> {
        Err(FormatError::Io(std::io::Error::other("read-only file system")))
    }
}

fn config() -> ClientConfig {
    ClientConfig::default()
        .with_base_url(BASE)
        .with_throttle(ThrottleConfig::disabled())
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::new(
        DateKey::parse(start).unwrap().date(),
        DateKey::parse(end).unwrap().date(),
    )
    .unwrap()
}

fn station(id: &str, localidad: &str, gasoleo: &str, gasolina: &str) -> serde_json::Value {
    json!({
        "C.P.": "8001",
        "Dirección": format!("CALLE MAYOR {id}"),
        "Horario": format!("L-D: 0{id}:00-22:00"),
        "Latitud": "41,385064",
        "Localidad": localidad,
        "Longitud (WGS84)": "2,173403",
        "Margen": "D",
        "Municipio": "Barcelona",
        "Precio Gasoleo A": gasoleo,
        "Precio Gasolina 95 E5": gasolina,
        "Provincia": "BARCELONA",
        "Remisión": "dm",
        "Rótulo": "REPSOL",
        "IDEESS": id
    })
}

fn two_stations() -> String {
    json!({
        "Fecha": "01/01/2024 0:00:00",
        "ListaEESSPrecio": [
            station("4375", "BARCELONA", "1,589", "1,659"),
            station("5122", "BADALONA", "1,579", "1,649")
        ],
        "Nota": "Archivo de todos los productos en todas las estaciones de servicio.",
        "ResultadoConsulta": "OK"
    })
    .to_string()
}

async fn run(
    upstream: Upstream,
    range: DateRange,
    selection: &str,
) -> (Upstream, MemoryWriter, Vec<Outcome>) {
    run_with(upstream, range, selection, config()).await
}

async fn run_with(
    upstream: Upstream,
    range: DateRange,
    selection: &str,
    config: ClientConfig,
) -> (Upstream, MemoryWriter, Vec<Outcome>) {
    let writer = MemoryWriter::default();
    let scheduler = FetchScheduler::new(upstream.clone(), config);
    let pipeline = Pipeline::new(scheduler, Arc::new(writer.clone()))
        .with_selection(FuelSelection::from_list(selection));
    let outcomes = pipeline.run_all(range).await;
    (upstream, writer, outcomes)
}

#[tokio::test]
async fn single_day_success_keeps_selected_fuel() {
    let upstream = Upstream::default().respond("01-01-2024", 200, two_stations());
    let (_, writer, outcomes) = run(upstream, range("01-01-2024", "01-01-2024"), "gasoleo a").await;

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.rows, 2);
    assert_eq!(outcome.output.as_deref(), Some("precios_01_01_2024.csv"));
    assert_eq!(outcome.attempts, 1);

    let tables = writer.tables.lock().unwrap();
    let table = &tables[0];
    let columns: Vec<_> = table.column_names().collect();
    for kept in [
        "IDEESS",
        "Rótulo",
        "Dirección",
        "C.P.",
        "Localidad",
        "Municipio",
        "Provincia",
        "Latitud",
        "Longitud (WGS84)",
        "Precio Gasoleo A",
    ] {
        assert!(columns.contains(&kept), "{kept} missing from {columns:?}");
    }
    assert!(!columns.contains(&"Precio Gasolina 95 E5"));
    let fuels = columns.iter().filter(|c| c.starts_with("Precio ")).count();
    assert_eq!(fuels, 1);

    // Sorted by locality: BADALONA before BARCELONA.
    let ids: Vec<String> = table
        .column("IDEESS")
        .unwrap()
        .cells
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(ids, ["5122", "4375"]);
    assert_eq!(table.column("C.P.").unwrap().cells[0].to_string(), "08001");
}

#[tokio::test]
async fn non_transient_status_is_terminal_without_retry() {
    let upstream = Upstream::default().respond("15-03-2024", 404, "Not Found");
    let (upstream, writer, outcomes) =
        run(upstream, range("15-03-2024", "15-03-2024"), "Gasoleo A").await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::HttpError(404));
    assert_eq!(outcomes[0].attempts, 1);
    assert_eq!(outcomes[0].error.as_deref(), Some("Not Found"));
    assert_eq!(upstream.calls_for("15-03-2024"), 1);
    assert!(writer.tables.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_station_list_is_no_data() {
    let upstream =
        Upstream::default().respond("02-02-2024", 200, r#"{"ListaEESSPrecio":[],"ResultadoConsulta":"OK"}"#);
    let (_, writer, outcomes) = run(upstream, range("02-02-2024", "02-02-2024"), "Gasoleo A").await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::NoData);
    assert_eq!(outcomes[0].rows, 0);
    assert!(outcomes[0].output.is_none());
    assert!(writer.tables.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transient_status_retried_up_to_max_attempts() {
    let upstream = Upstream::default().respond("10-10-2024", 503, "Service Unavailable");
    let (upstream, _, outcomes) = run(upstream, range("10-10-2024", "10-10-2024"), "").await;

    assert_eq!(outcomes[0].status, OutcomeStatus::HttpError(503));
    assert_eq!(outcomes[0].attempts, 4);
    assert_eq!(upstream.calls_for("10-10-2024"), 4);
}

#[tokio::test]
async fn network_failure_is_error() {
    let upstream = Upstream::default().fail("11-10-2024");
    let config = config().with_max_attempts(2);
    let (upstream, _, outcomes) =
        run_with(upstream, range("11-10-2024", "11-10-2024"), "", config).await;

    assert_eq!(outcomes[0].status, OutcomeStatus::Error);
    assert_eq!(outcomes[0].attempts, 2);
    assert!(outcomes[0].error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(upstream.calls_for("11-10-2024"), 2);
}

#[tokio::test]
async fn network_failure_after_transient_statuses_keeps_last_status() {
    let upstream = Upstream::default()
        .respond("12-10-2024", 503, "Service Unavailable")
        .respond("12-10-2024", 502, "Bad Gateway")
        .respond("12-10-2024", 503, "Service Unavailable")
        .fail("12-10-2024");
    let (upstream, _, outcomes) = run(upstream, range("12-10-2024", "12-10-2024"), "").await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::HttpError(503));
    assert_eq!(outcomes[0].status.label(), "http_503");
    assert_eq!(outcomes[0].attempts, 4);
    assert_eq!(upstream.calls_for("12-10-2024"), 4);
}

#[tokio::test]
async fn malformed_body_is_json_error() {
    let upstream = Upstream::default().respond("05-05-2024", 200, "<html>mantenimiento</html>");
    let (_, _, outcomes) = run(upstream, range("05-05-2024", "05-05-2024"), "").await;

    assert_eq!(outcomes[0].status, OutcomeStatus::JsonError);
    let detail = outcomes[0].error.as_deref().unwrap();
    assert!(!detail.is_empty() && detail.chars().count() <= 200);
}

#[tokio::test]
async fn one_outcome_per_date_despite_failures() {
    let upstream = Upstream::default()
        .respond("01-01-2024", 200, two_stations())
        .respond("03-01-2024", 404, "")
        .respond("05-01-2024", 500, "")
        .respond("07-01-2024", 200, "not json")
        .fail("09-01-2024")
        .respond("12-01-2024", 200, two_stations());
    let range = range("28-12-2023", "14-01-2024");
    let (_, writer, outcomes) = run(upstream, range, "Gasolina 95 E5").await;

    assert_eq!(outcomes.len(), range.total_days());
    let mut dates: Vec<DateKey> = outcomes.iter().map(|o| o.date).collect();
    dates.sort();
    dates.dedup();
    assert_eq!(dates, range.dates().collect::<Vec<_>>());

    let summary = RunSummary::from_outcomes(&range, &outcomes);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.http_error.get(&404), Some(&1));
    assert_eq!(summary.http_error.get(&500), Some(&1));
    assert_eq!(summary.json_error, 1);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.no_data, range.total_days() - 6);
    assert_eq!(summary.total_rows, 4);
    assert!(summary.is_complete());
    assert_eq!(writer.tables.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn shutdown_stops_dispatch() {
    let upstream = Upstream::default();
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    let scheduler = FetchScheduler::new(upstream.clone(), config());
    let pipeline = Pipeline::new(scheduler, Arc::new(MemoryWriter::default()))
        .with_shutdown(Arc::clone(&shutdown));

    let range = range("01-01-2024", "31-01-2024");
    let outcomes = pipeline.run_all(range).await;

    assert!(outcomes.is_empty());
    assert_eq!(upstream.total.load(Ordering::SeqCst), 0);
    let summary = RunSummary::from_outcomes(&range, &outcomes);
    assert_eq!(summary.missing.len(), 31);
}

#[tokio::test]
async fn abandon_cancels_pending_retry() {
    let upstream = Gated::default();
    let scheduler = FetchScheduler::new(upstream.clone(), config());
    let pipeline = Pipeline::new(scheduler, Arc::new(MemoryWriter::default()));

    let (outcomes, ()) = tokio::join!(pipeline.run_all(range("01-01-2024", "01-01-2024")), async {
        while upstream.total.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        pipeline.abandon();
        upstream.release.notify_one();
    });

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, OutcomeStatus::Error);
    assert_eq!(outcomes[0].attempts, 1);
    assert!(outcomes[0].error.as_deref().unwrap().contains("cancelled"));
    assert_eq!(upstream.total.load(Ordering::SeqCst), 1);
    assert!(pipeline.shutdown().is_shutdown_requested());
}

#[tokio::test]
async fn abandoned_pipeline_dispatches_nothing() {
    let upstream = Upstream::default();
    let scheduler = FetchScheduler::new(upstream.clone(), config());
    let pipeline = Pipeline::new(scheduler, Arc::new(MemoryWriter::default()));
    pipeline.abandon();

    let outcomes = pipeline.run_all(range("01-01-2024", "07-01-2024")).await;

    assert!(outcomes.is_empty());
    assert_eq!(upstream.total.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn write_failure_is_error_outcome() {
    let upstream = Upstream::default().respond("01-01-2024", 200, two_stations());
    let scheduler = FetchScheduler::new(upstream, config());
    let pipeline = Pipeline::new(scheduler, Arc::new(BrokenWriter));

    let outcomes = pipeline.run_all(range("01-01-2024", "01-01-2024")).await;

    assert_eq!(outcomes[0].status, OutcomeStatus::Error);
    assert!(outcomes[0].error.as_deref().unwrap().contains("read-only"));
}

#[tokio::test]
async fn file_writer_produces_csv() {
    let root = tempfile::tempdir().unwrap();
    let range = range("01-01-2024", "01-01-2024");
    let upstream = Upstream::default().respond("01-01-2024", 200, two_stations());
    let scheduler = FetchScheduler::new(upstream, config());
    let writer = FileTableWriter::for_range(root.path(), &range, OutputFormat::Csv);
    let pipeline = Pipeline::new(scheduler, Arc::new(writer))
        .with_selection(FuelSelection::from_list("Gasoleo A"));

    let outcomes = pipeline.run_all(range).await;

    let path = root
        .path()
        .join("carburantes_20240101_20240101")
        .join("precios_01_01_2024.csv");
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(outcomes[0].size_bytes, Some(content.len() as u64));
    let mut lines = content.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("Precio Gasoleo A"));
    assert!(!header.contains("Gasolina"));
    assert_eq!(lines.count(), 2);
}
