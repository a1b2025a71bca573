#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{Days, NaiveDate};
use finsync_core::{InstitutionParams, Profile, SyncOptions};
use finsync_ofx::{Clock, ManualClock, OfxError, StatementSource};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `(requested_start, today) -> Some((reported_start, reported_end))`, or
/// `None` for a response without a statement range.
type Responder = Box<dyn Fn(NaiveDate, NaiveDate) -> Option<(NaiveDate, NaiveDate)> + Send + Sync>;

/// An OFX server stand-in driven by the shared manual clock.
pub struct SimulatedServer {
    number: String,
    clock: ManualClock,
    respond: Responder,
    fail_on_request: Option<usize>,
    requests: Mutex<Vec<NaiveDate>>,
}

impl SimulatedServer {
    pub fn new(
        number: &str,
        clock: &ManualClock,
        respond: impl Fn(NaiveDate, NaiveDate) -> Option<(NaiveDate, NaiveDate)> + Send + Sync + 'static,
    ) -> Self {
        Self {
            number: number.to_string(),
            clock: clock.clone(),
            respond: Box::new(respond),
            fail_on_request: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serves every window starting on or after `earliest`, up to `window_days` long.
    pub fn from_date(number: &str, clock: &ManualClock, earliest: NaiveDate, window_days: u64) -> Self {
        Self::new(number, clock, move |start, today| {
            if start < earliest {
                return None;
            }
            let capped = start + Days::new(window_days.saturating_sub(1));
            Some((start, capped.min(today)))
        })
    }

    /// Zero-based index of a request that fails at the transport level.
    pub fn failing_on(mut self, request: usize) -> Self {
        self.fail_on_request = Some(request);
        self
    }

    pub fn requested_starts(&self) -> Vec<NaiveDate> {
        self.requests.lock().unwrap().clone()
    }
}

impl StatementSource for SimulatedServer {
    fn number(&self) -> &str {
        &self.number
    }

    async fn download(&self, days: u32) -> Result<Vec<u8>, OfxError> {
        let today = self.clock.today();
        let start = today - Days::new(u64::from(days));
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(start);
            requests.len() - 1
        };
        if self.fail_on_request == Some(index) {
            return Err(OfxError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(match (self.respond)(start, today) {
            Some((s, e)) => statement(s, e),
            None => no_data(),
        })
    }
}

pub fn statement(start: NaiveDate, end: NaiveDate) -> Vec<u8> {
    format!(
        "OFXHEADER:100\r\nDATA:OFXSGML\r\nVERSION:102\r\n\r\n\
         <OFX><SIGNONMSGSRSV1><SONRS><STATUS><CODE>0<SEVERITY>INFO</STATUS></SONRS></SIGNONMSGSRSV1>\
         <BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STATUS><CODE>0<SEVERITY>INFO</STATUS><STMTRS><CURDEF>USD\
         <BANKTRANLIST><DTSTART>{}120000.000[-5:EST]<DTEND>{}120000.000[-5:EST]</BANKTRANLIST>\
         </STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>",
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
    )
    .into_bytes()
}

pub fn no_data() -> Vec<u8> {
    b"OFXHEADER:100\r\nDATA:OFXSGML\r\nVERSION:102\r\n\r\n\
      <OFX><SIGNONMSGSRSV1><SONRS><STATUS><CODE>0<SEVERITY>INFO</STATUS></SONRS></SIGNONMSGSRSV1>\
      <BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STATUS><CODE>2000<SEVERITY>ERROR\
      <MESSAGE>No data for requested period</STATUS></STMTTRNRS></BANKMSGSRSV1></OFX>"
        .to_vec()
}

pub fn touch_statement(dir: &Path, start: NaiveDate, end: NaiveDate) {
    let name = format!("{}-{}--1700000000.ofx", start.format("%Y%m%d"), end.format("%Y%m%d"));
    std::fs::write(dir.join(name), statement(start, end)).unwrap();
}

/// Sorted `(start, end)` pairs encoded in the statement names under `dir`.
pub fn intervals_on_disk(dir: &Path) -> Vec<(NaiveDate, NaiveDate)> {
    let mut found: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".ofx"))
        .map(|name| {
            let start = NaiveDate::parse_from_str(&name[0..8], "%Y%m%d").unwrap();
            let end = NaiveDate::parse_from_str(&name[9..17], "%Y%m%d").unwrap();
            (start, end)
        })
        .collect();
    found.sort();
    found
}

pub fn profile(output_directory: &Path, sync: SyncOptions) -> Profile {
    Profile {
        output_directory: output_directory.to_path_buf(),
        ofx: InstitutionParams {
            id: "7101".to_string(),
            org: "Test Bank".to_string(),
            url: "https://ofx.test.invalid/".to_string(),
            broker_id: None,
            username: "user".to_string(),
            password: "secret".to_string(),
            ofx_version: "102".to_string(),
            client_uid: None,
            app_id: "QWIN".to_string(),
            app_ver: "2500".to_string(),
        },
        acct_dir_map: BTreeMap::new(),
        sync,
        min_request_interval_secs: None,
    }
}
