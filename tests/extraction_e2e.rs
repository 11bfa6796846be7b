// tests/extraction_e2e.rs
//
// Drives the whole extraction loop against a scripted page instead of a real
// browser. The fake renders HTML from a small simulation state and resolves
// the structural css paths the orchestrator clicks; `data-hook` attributes on
// the rendered elements say what each click does to the state.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scraper::{Html, Selector};
use tracing::instrument::WithSubscriber;
use tracing_subscriber::fmt::MakeWriter;

use fleet_reporter::config::Config;
use fleet_reporter::driver::PageDriver;
use fleet_reporter::extract::orchestrator;
use fleet_reporter::utils::error::{DriverError, ExtractError};

// --- Scripted Page ---

#[derive(Clone)]
struct PanelSpec {
    total: String,
    fare: String,
    service_fee: String,
    other: String,
    taxes: String,
    tip: String,
    refunds: String,
    adjustments: String,
    payout: String,
    trips: String,
    distance: String,
}

fn zero_panel() -> PanelSpec {
    PanelSpec {
        total: "AED 0.00".into(),
        fare: "AED 0.00".into(),
        service_fee: "AED 0.00".into(),
        other: "AED 0.00".into(),
        taxes: "AED 0.00".into(),
        tip: "AED 0.00".into(),
        refunds: "AED 0.00".into(),
        adjustments: "AED 0.00".into(),
        payout: "AED 0.00".into(),
        trips: "0".into(),
        distance: "0.0".into(),
    }
}

#[derive(Clone)]
struct RowSpec {
    name: String,
    listed: String,
    /// Render a trailing chevron button; without it the row itself is the
    /// click target.
    chevron: bool,
    /// What the details drawer shows once opened. `None` means clicking goes
    /// nowhere and the drawer never appears.
    panel: Option<PanelSpec>,
}

fn chevron_row(name: &str, listed: &str, panel: Option<PanelSpec>) -> RowSpec {
    RowSpec {
        name: name.into(),
        listed: listed.into(),
        chevron: true,
        panel,
    }
}

fn plain_row(name: &str, listed: &str, panel: Option<PanelSpec>) -> RowSpec {
    RowSpec {
        name: name.into(),
        listed: listed.into(),
        chevron: false,
        panel,
    }
}

struct SimState {
    pages: Vec<Vec<RowSpec>>,
    page: usize,
    chip: String,
    page_size: u32,
    menu_open: bool,
    open_panel: Option<PanelSpec>,
    panel_expanded: bool,
    /// Leave Next clickable on the last page; the click then goes nowhere.
    next_always_enabled: bool,
    /// One-shot: the next snapshot taken while a panel is open fails.
    drop_snapshot_with_panel: bool,
    /// One-shot: the next Escape pressed while a panel is open fails.
    lose_escape_with_panel: bool,
    actions: Vec<String>,
}

fn render(st: &SimState) -> String {
    let mut body = String::new();

    body.push_str("<div>");
    if !st.chip.is_empty() {
        body.push_str(&format!("<button>{}</button>", st.chip));
    }
    body.push_str(&format!(
        r#"<div><button data-hook="rows-menu">{} rows</button></div>"#,
        st.page_size
    ));
    body.push_str("</div>");

    body.push_str("<div><div>Driver name Total earnings</div>");
    for (i, row) in st.pages[st.page].iter().enumerate() {
        body.push_str(&render_row(row, st.page, i));
    }
    body.push_str("</div>");

    let last_page = st.page + 1 >= st.pages.len();
    if last_page && !st.next_always_enabled {
        body.push_str("<div><button disabled>Next</button></div>");
    } else {
        body.push_str(r#"<div><button data-hook="next">Next</button></div>"#);
    }

    // Overlays go after the static layout so the css paths planned from a
    // panel-free snapshot keep resolving while they are open.
    if st.menu_open {
        body.push_str(concat!(
            r#"<div role="listbox">"#,
            r#"<button data-hook="rows-pick:25">25</button>"#,
            r#"<button data-hook="rows-pick:100">100</button>"#,
            "</div>"
        ));
    }
    if let Some(panel) = &st.open_panel {
        body.push_str(&render_panel(panel, st.panel_expanded));
    }

    format!("<html><body>{}</body></html>", body)
}

fn render_row(row: &RowSpec, page: usize, idx: usize) -> String {
    let hook = format!("open:{}:{}", page, idx);
    if row.chevron {
        format!(
            concat!(
                r#"<div role="row">"#,
                "<div><span>{}</span></div>",
                "<div><span>{}</span></div>",
                r#"<div><button data-hook="{}"><svg></svg></button></div>"#,
                "</div>"
            ),
            row.name, row.listed, hook
        )
    } else {
        format!(
            concat!(
                r#"<div role="row" data-hook="{}">"#,
                "<div><span>{}</span></div>",
                "<div><span>{}</span></div>",
                "</div>"
            ),
            hook, row.name, row.listed
        )
    }
}

fn render_panel(p: &PanelSpec, expanded: bool) -> String {
    let mut s = String::from(r#"<div data-baseweb="drawer"><section>"#);
    s.push_str(&format!(
        concat!(
            "<div><span>Total earnings</span>",
            r#"<button aria-expanded="{}" data-hook="toggle">v</button>"#,
            "<span>{}</span></div>"
        ),
        expanded, p.total
    ));
    if expanded {
        s.push_str(&format!(
            "<div><span>Fare</span><span>{}</span></div>",
            p.fare
        ));
        s.push_str(&format!(
            "<div><span>Service Fee</span><span>{}</span></div>",
            p.service_fee
        ));
        s.push_str(&format!(
            "<div><span>Other earnings</span><span>{}</span></div>",
            p.other
        ));
        s.push_str(&format!(
            "<div><span>Taxes</span><span>{}</span></div>",
            p.taxes
        ));
        s.push_str(&format!("<div><span>Tip</span><span>{}</span></div>", p.tip));
    }
    s.push_str("</section>");
    s.push_str(&format!(
        "<div><span>Refunds &amp; Expenses</span><span>{}</span></div>",
        p.refunds
    ));
    s.push_str(&format!(
        "<div><span>Adjustments from previous periods</span><span>{}</span></div>",
        p.adjustments
    ));
    s.push_str(&format!(
        "<div><span>Payout</span><span>{}</span></div>",
        p.payout
    ));
    s.push_str(&format!("<div>Trips {}</div>", p.trips));
    s.push_str(&format!("<div>{} km</div>", p.distance));
    s.push_str("</div>");
    s
}

struct ScriptedDriver {
    state: Mutex<SimState>,
}

impl ScriptedDriver {
    fn new(pages: Vec<Vec<RowSpec>>) -> Self {
        ScriptedDriver {
            state: Mutex::new(SimState {
                pages,
                page: 0,
                chip: "Sep 1st, 2025 04:01 AM \u{2013} Sep 7th, 2025 03:59 AM".into(),
                page_size: 10,
                menu_open: false,
                open_panel: None,
                panel_expanded: false,
                next_always_enabled: false,
                drop_snapshot_with_panel: false,
                lose_escape_with_panel: false,
                actions: Vec::new(),
            }),
        }
    }

    fn with_chip(self, chip: &str) -> Self {
        self.state.lock().unwrap().chip = chip.into();
        self
    }

    fn keep_next_enabled(self) -> Self {
        self.state.lock().unwrap().next_always_enabled = true;
        self
    }

    fn drop_snapshot_while_panel_open(self) -> Self {
        self.state.lock().unwrap().drop_snapshot_with_panel = true;
        self
    }

    fn lose_escape_while_panel_open(self) -> Self {
        self.state.lock().unwrap().lose_escape_with_panel = true;
        self
    }

    fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    fn page_size(&self) -> u32 {
        self.state.lock().unwrap().page_size
    }

    fn apply(&self, hook: &str) {
        let mut st = self.state.lock().unwrap();
        match hook {
            "rows-menu" => st.menu_open = true,
            "toggle" => st.panel_expanded = true,
            "next" => {
                if st.page + 1 < st.pages.len() {
                    st.page += 1;
                }
            }
            _ => {
                if let Some(n) = hook.strip_prefix("rows-pick:") {
                    st.page_size = n.parse().unwrap_or(st.page_size);
                    st.menu_open = false;
                } else if let Some(addr) = hook.strip_prefix("open:") {
                    let mut parts = addr.splitn(2, ':');
                    let page: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                    let row: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
                    let panel = st
                        .pages
                        .get(page)
                        .and_then(|rows| rows.get(row))
                        .and_then(|r| r.panel.clone());
                    if let Some(panel) = panel {
                        st.open_panel = Some(panel);
                        st.panel_expanded = false;
                    }
                }
            }
        }
        st.actions.push(hook.to_string());
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn content(&self) -> Result<String, DriverError> {
        let mut st = self.state.lock().unwrap();
        if st.drop_snapshot_with_panel && st.open_panel.is_some() {
            st.drop_snapshot_with_panel = false;
            return Err(DriverError::Protocol("snapshot dropped".into()));
        }
        Ok(render(&st))
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok("https://supplier.uber.com/orgs/test-org/earnings".to_string())
    }

    async fn click(&self, css: &str) -> Result<(), DriverError> {
        let hook = {
            let st = self.state.lock().unwrap();
            let html = render(&st);
            let doc = Html::parse_document(&html);
            let sel = Selector::parse(css)
                .map_err(|e| DriverError::Protocol(format!("bad selector {}: {}", css, e)))?;
            let Some(el) = doc.select(&sel).next() else {
                return Err(DriverError::NotFound(css.to_string()));
            };
            el.value().attr("data-hook").map(str::to_string)
        };
        if let Some(hook) = hook {
            self.apply(&hook);
        }
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), DriverError> {
        let mut st = self.state.lock().unwrap();
        if st.lose_escape_with_panel && st.open_panel.is_some() {
            st.lose_escape_with_panel = false;
            return Err(DriverError::Protocol("escape keystroke dropped".into()));
        }
        st.open_panel = None;
        st.panel_expanded = false;
        st.menu_open = false;
        Ok(())
    }

    async fn settle(&self, _wait: Duration) {}

    async fn wait_network_idle(&self, _budget: Duration) {}
}

// --- Log Capture ---

/// Collects formatted warnings so a test can assert on what the walk
/// reported.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish()
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> CapturedLogs {
        self.clone()
    }
}

// --- Fixtures ---

fn test_config() -> Config {
    Config {
        currency: "AED".into(),
        snapshot_dir: None,
        ..Config::default()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn two_week_pages() -> Vec<Vec<RowSpec>> {
    vec![
        vec![
            chevron_row(
                "Ayesha Khan",
                "AED 1,234.56",
                Some(PanelSpec {
                    total: "AED 1,234.56".into(),
                    fare: "AED 1,500.00".into(),
                    service_fee: "-AED 300.00".into(),
                    other: "AED 25.00".into(),
                    taxes: "AED 9.56".into(),
                    tip: "AED 12.50".into(),
                    refunds: "-AED 20.00".into(),
                    adjustments: "AED 5.00".into(),
                    payout: "AED 1,219.56".into(),
                    trips: "23".into(),
                    distance: "310.5".into(),
                }),
            ),
            chevron_row("Lena Park", "AED 0.00", None),
            plain_row(
                "Omar Said",
                "AED 980.00",
                Some(PanelSpec {
                    total: "AED 980.00".into(),
                    fare: "AED 1,100.00".into(),
                    service_fee: "-AED 120.00".into(),
                    payout: "AED 980.00".into(),
                    trips: "17".into(),
                    distance: "201.4".into(),
                    ..zero_panel()
                }),
            ),
        ],
        vec![
            chevron_row(
                "Noura Hassan",
                "AED 450.00",
                Some(PanelSpec {
                    total: "AED 450.00".into(),
                    fare: "AED 500.00".into(),
                    service_fee: "-AED 50.00".into(),
                    tip: "AED 5.75".into(),
                    payout: "AED 455.75".into(),
                    trips: "9".into(),
                    distance: "88.0".into(),
                    ..zero_panel()
                }),
            ),
            chevron_row(
                "Yusuf Ali",
                "AED 2,010.10",
                Some(PanelSpec {
                    total: "AED 2,010.10".into(),
                    fare: "AED 2,200.00".into(),
                    service_fee: "-AED 200.00".into(),
                    other: "AED 10.10".into(),
                    payout: "AED 2,000.00".into(),
                    trips: "41".into(),
                    distance: "512.25".into(),
                    ..zero_panel()
                }),
            ),
        ],
    ]
}

// --- Tests ---

#[tokio::test]
async fn walks_both_pages_and_reads_every_panel() {
    let driver = ScriptedDriver::new(two_week_pages());
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    assert_eq!(outcome.pages_processed, 2);
    let names: Vec<&str> = outcome.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Ayesha Khan",
            "Lena Park",
            "Omar Said",
            "Noura Hassan",
            "Yusuf Ali"
        ]
    );

    let range = outcome.range.as_ref().expect("range should resolve");
    assert_eq!(range.start, date(2025, 9, 1));
    assert_eq!(range.end, date(2025, 9, 7));
    assert!(range.display_text.contains("Sep 1st, 2025 04:01 AM"));

    let ayesha = &outcome.records[0];
    assert_eq!(ayesha.total_earnings, dec!(1234.56));
    assert_eq!(ayesha.fare, dec!(1500.00));
    assert_eq!(ayesha.service_fee, dec!(-300.00));
    assert_eq!(ayesha.other_earnings, dec!(25.00));
    assert_eq!(ayesha.taxes, dec!(9.56));
    assert_eq!(ayesha.tips, dec!(12.50));
    assert_eq!(ayesha.refunds_expenses, dec!(-20.00));
    assert_eq!(ayesha.adjustments, dec!(5.00));
    assert_eq!(ayesha.payout, dec!(1219.56));
    assert_eq!(ayesha.net_earnings, dec!(2439.12));
    assert_eq!(ayesha.trips, 23);
    assert_eq!(ayesha.distance_km, dec!(310.5));
    assert_eq!(ayesha.start_date, date(2025, 9, 1));
    assert_eq!(ayesha.end_date, date(2025, 9, 7));
    assert_eq!(ayesha.reconstructed_total(), dec!(1247.06));

    let omar = &outcome.records[2];
    assert_eq!(omar.total_earnings, dec!(980.00));
    assert_eq!(omar.fare, dec!(1100.00));
    assert_eq!(omar.service_fee, dec!(-120.00));
    assert_eq!(omar.payout, dec!(980.00));
    assert_eq!(omar.trips, 17);
    assert_eq!(omar.distance_km, dec!(201.4));

    assert_eq!(outcome.records[3].payout, dec!(455.75));
    assert_eq!(outcome.records[4].payout, dec!(2000.00));
    assert_eq!(outcome.records[4].trips, 41);
}

#[tokio::test]
async fn unopenable_panel_degrades_to_a_zeroed_record() {
    let driver = ScriptedDriver::new(two_week_pages());
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    let lena = &outcome.records[1];
    assert_eq!(lena.name, "Lena Park");
    assert_eq!(lena.total_earnings, Decimal::ZERO);
    assert_eq!(lena.payout, Decimal::ZERO);
    assert_eq!(lena.net_earnings, Decimal::ZERO);
    assert_eq!(lena.trips, 0);
    assert_eq!(lena.start_date, date(2025, 9, 1));
    assert_eq!(lena.end_date, date(2025, 9, 7));
}

#[tokio::test]
async fn a_dropped_snapshot_mid_read_zeroes_only_that_row() {
    let pages = vec![two_week_pages().swap_remove(0)];
    let driver = ScriptedDriver::new(pages).drop_snapshot_while_panel_open();
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("one lost snapshot should not abort the walk");

    // Ayesha's panel was open when the snapshot failed; she degrades to a
    // zeroed row and the rows after her still read in full.
    assert_eq!(outcome.records.len(), 3);
    let ayesha = &outcome.records[0];
    assert_eq!(ayesha.name, "Ayesha Khan");
    assert_eq!(ayesha.total_earnings, Decimal::ZERO);
    assert_eq!(ayesha.payout, Decimal::ZERO);
    assert_eq!(ayesha.trips, 0);
    assert_eq!(ayesha.start_date, date(2025, 9, 1));
    assert_eq!(ayesha.end_date, date(2025, 9, 7));
    let omar = &outcome.records[2];
    assert_eq!(omar.name, "Omar Said");
    assert_eq!(omar.total_earnings, dec!(980.00));
    assert_eq!(omar.trips, 17);
}

#[tokio::test]
async fn a_lost_escape_keystroke_does_not_abort_the_walk() {
    let mut rows = two_week_pages().swap_remove(0);
    rows.remove(1);
    let driver = ScriptedDriver::new(vec![rows]).lose_escape_while_panel_open();
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("one lost keystroke should not abort the walk");

    // The first panel never closed, but the next row's click replaces it
    // in the drawer and both rows come out intact.
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].name, "Ayesha Khan");
    assert_eq!(outcome.records[0].total_earnings, dec!(1234.56));
    assert_eq!(outcome.records[1].name, "Omar Said");
    assert_eq!(outcome.records[1].total_earnings, dec!(980.00));
}

#[tokio::test]
async fn widens_rows_per_page_before_walking_rows() {
    let driver = ScriptedDriver::new(two_week_pages());
    orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    assert_eq!(driver.page_size(), 100);
    let actions = driver.actions();
    let menu = actions.iter().position(|a| a == "rows-menu").unwrap();
    let pick = actions.iter().position(|a| a == "rows-pick:100").unwrap();
    let first_open = actions.iter().position(|a| a.starts_with("open:")).unwrap();
    assert!(menu < pick);
    assert!(pick < first_open);
}

#[tokio::test]
async fn expands_the_breakdown_once_per_opened_panel() {
    let driver = ScriptedDriver::new(two_week_pages());
    orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    // Four panels open (Lena's never does); each starts collapsed.
    let toggles = driver.actions().iter().filter(|a| *a == "toggle").count();
    assert_eq!(toggles, 4);
}

#[tokio::test]
async fn advances_once_then_stops_on_disabled_next() {
    let driver = ScriptedDriver::new(two_week_pages());
    orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    let nexts = driver.actions().iter().filter(|a| *a == "next").count();
    assert_eq!(nexts, 1);
}

#[tokio::test]
async fn enabled_but_inert_next_stops_the_walk() {
    let pages = vec![two_week_pages().swap_remove(0)];
    let driver = ScriptedDriver::new(pages).keep_next_enabled();
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.records.len(), 3);
    // The click happened, the table did not move, and the walk ended.
    let nexts = driver.actions().iter().filter(|a| *a == "next").count();
    assert_eq!(nexts, 1);
}

#[tokio::test]
async fn page_cap_stops_the_walk_and_warns() {
    let logs = CapturedLogs::default();
    let driver = ScriptedDriver::new(two_week_pages());
    let cfg = Config {
        max_pages: 1,
        ..test_config()
    };
    let outcome = orchestrator::run(&driver, &cfg)
        .with_subscriber(logs.subscriber())
        .await
        .expect("extraction should succeed");

    assert_eq!(outcome.pages_processed, 1);
    assert_eq!(outcome.records.len(), 3);
    assert!(!driver.actions().iter().any(|a| a == "next"));
    // A second page was still reachable, so the stop is a truncation.
    assert!(logs.text().contains("page cap"));
}

#[tokio::test]
async fn cap_on_the_roster_end_is_a_quiet_stop() {
    let logs = CapturedLogs::default();
    let driver = ScriptedDriver::new(two_week_pages());
    let cfg = Config {
        max_pages: 2,
        ..test_config()
    };
    let outcome = orchestrator::run(&driver, &cfg)
        .with_subscriber(logs.subscriber())
        .await
        .expect("extraction should succeed");

    // The cap and the last page coincide; Next is already disabled, so
    // nothing was left behind and no truncation is reported.
    assert_eq!(outcome.pages_processed, 2);
    assert_eq!(outcome.records.len(), 5);
    assert!(!logs.text().contains("page cap"));
}

#[tokio::test]
async fn empty_table_is_an_error() {
    let driver = ScriptedDriver::new(vec![vec![]]);
    let err = orchestrator::run(&driver, &test_config())
        .await
        .expect_err("no rows should fail");
    assert!(matches!(err, ExtractError::NoDriverRows));
    assert_eq!(err.to_string(), "Could not find driver table.");
}

#[tokio::test]
async fn header_echoes_alone_yield_no_records() {
    // Two rows that both read like the header; the walk filters them and
    // ends with nothing extracted.
    let pages = vec![vec![
        plain_row("Driver name", "Total earnings", None),
        plain_row("Driver name", "Total earnings", None),
    ]];
    let driver = ScriptedDriver::new(pages);
    let err = orchestrator::run(&driver, &test_config())
        .await
        .expect_err("header-only table should fail");
    assert!(matches!(err, ExtractError::NoRecords));
    assert_eq!(err.to_string(), "No driver data was extracted.");
}

#[tokio::test]
async fn missing_date_chip_falls_back_to_today() {
    let pages = vec![two_week_pages().swap_remove(1)];
    let driver = ScriptedDriver::new(pages).with_chip("");
    let outcome = orchestrator::run(&driver, &test_config())
        .await
        .expect("extraction should succeed");

    assert!(outcome.range.is_none());
    let today = chrono::Local::now().date_naive();
    assert_eq!(outcome.records[0].start_date, today);
    assert_eq!(outcome.records[0].end_date, today);
}
