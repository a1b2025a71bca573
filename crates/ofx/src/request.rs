//! OFX request documents: header, signon, and the three statement flavours.

use chrono::{NaiveDate, NaiveDateTime};
use finsync_core::InstitutionParams;
use uuid::Uuid;

use crate::account::{AccountDescriptor, AccountKind};

const OFX_DATETIME: &str = "%Y%m%d%H%M%S";
const OFX_DATE: &str = "%Y%m%d";
const LINE_END: &str = "\r\n";

/// OFX 1.x requests are SGML with unclosed leaves; 2.x requests are XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sgml,
    Xml,
}

impl Dialect {
    pub fn for_version(version: &str) -> Self {
        if version.trim().starts_with('2') {
            Dialect::Xml
        } else {
            Dialect::Sgml
        }
    }
}

struct OfxWriter {
    dialect: Dialect,
    buf: String,
}

impl OfxWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            buf: String::new(),
        }
    }

    fn open(&mut self, tag: &str) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(tag);
        self.buf.push('>');
        self
    }

    fn close(&mut self, tag: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(tag);
        self.buf.push('>');
        self
    }

    fn leaf(&mut self, tag: &str, value: &str) -> &mut Self {
        self.open(tag);
        self.buf.push_str(&escape(value));
        if self.dialect == Dialect::Xml {
            self.close(tag);
        }
        self
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn header(params: &InstitutionParams) -> String {
    let version = params.ofx_version.trim();
    match Dialect::for_version(version) {
        Dialect::Sgml => {
            let version_line = format!("VERSION:{version}");
            [
                "OFXHEADER:100",
                "DATA:OFXSGML",
                version_line.as_str(),
                "SECURITY:NONE",
                "ENCODING:USASCII",
                "CHARSET:1252",
                "COMPRESSION:NONE",
                "OLDFILEUID:NONE",
                "NEWFILEUID:NONE",
                "",
                "",
            ]
            .join(LINE_END)
        }
        Dialect::Xml => {
            let ofx_line = format!(
                r#"<?OFX OFXHEADER="200" VERSION="{version}" SECURITY="NONE" OLDFILEUID="NONE" NEWFILEUID="NONE"?>"#
            );
            [
                r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#,
                ofx_line.as_str(),
                "",
            ]
            .join(LINE_END)
        }
    }
}

fn signon(w: &mut OfxWriter, params: &InstitutionParams, now: NaiveDateTime) {
    w.open("SIGNONMSGSRQV1").open("SONRQ");
    w.leaf("DTCLIENT", &now.format(OFX_DATETIME).to_string())
        .leaf("USERID", &params.username)
        .leaf("USERPASS", &params.password)
        .leaf("LANGUAGE", "ENG");
    w.open("FI")
        .leaf("ORG", &params.org)
        .leaf("FID", &params.id)
        .close("FI");
    w.leaf("APPID", &params.app_id).leaf("APPVER", &params.app_ver);
    if let Some(client_uid) = &params.client_uid {
        w.leaf("CLIENTUID", client_uid);
    }
    w.close("SONRQ").close("SIGNONMSGSRQV1");
}

fn document(
    params: &InstitutionParams,
    now: NaiveDateTime,
    body: impl FnOnce(&mut OfxWriter),
) -> String {
    let mut w = OfxWriter::new(Dialect::for_version(&params.ofx_version));
    w.open("OFX");
    signon(&mut w, params, now);
    body(&mut w);
    w.close("OFX");
    format!("{}{}{LINE_END}", header(params), w.finish())
}

fn transaction_wrapper(w: &mut OfxWriter, trnuid: Uuid) {
    w.leaf("TRNUID", &trnuid.to_string()).leaf("CLTCOOKIE", "4");
}

fn inctran(w: &mut OfxWriter, start: NaiveDate) {
    w.open("INCTRAN")
        .leaf("DTSTART", &start.format(OFX_DATE).to_string())
        .leaf("INCLUDE", "Y")
        .close("INCTRAN");
}

/// Signon plus an account-information request listing every account of the login.
pub fn account_list_request(params: &InstitutionParams, now: NaiveDateTime, trnuid: Uuid) -> String {
    document(params, now, |w| {
        w.open("SIGNUPMSGSRQV1").open("ACCTINFOTRNRQ");
        transaction_wrapper(w, trnuid);
        w.open("ACCTINFORQ")
            .leaf("DTACCTUP", "19700101000000")
            .close("ACCTINFORQ");
        w.close("ACCTINFOTRNRQ").close("SIGNUPMSGSRQV1");
    })
}

/// Statement request for `account` covering `start` through the server's present.
pub fn statement_request(
    params: &InstitutionParams,
    account: &AccountDescriptor,
    start: NaiveDate,
    now: NaiveDateTime,
    trnuid: Uuid,
) -> String {
    document(params, now, |w| match &account.kind {
        AccountKind::Bank {
            bank_id,
            account_type,
        } => {
            w.open("BANKMSGSRQV1").open("STMTTRNRQ");
            transaction_wrapper(w, trnuid);
            w.open("STMTRQ").open("BANKACCTFROM");
            w.leaf("BANKID", bank_id)
                .leaf("ACCTID", &account.number)
                .leaf("ACCTTYPE", account_type);
            w.close("BANKACCTFROM");
            inctran(w, start);
            w.close("STMTRQ").close("STMTTRNRQ").close("BANKMSGSRQV1");
        }
        AccountKind::CreditCard => {
            w.open("CREDITCARDMSGSRQV1").open("CCSTMTTRNRQ");
            transaction_wrapper(w, trnuid);
            w.open("CCSTMTRQ").open("CCACCTFROM");
            w.leaf("ACCTID", &account.number);
            w.close("CCACCTFROM");
            inctran(w, start);
            w.close("CCSTMTRQ").close("CCSTMTTRNRQ").close("CREDITCARDMSGSRQV1");
        }
        AccountKind::Investment { broker_id } => {
            w.open("INVSTMTMSGSRQV1").open("INVSTMTTRNRQ");
            transaction_wrapper(w, trnuid);
            w.open("INVSTMTRQ").open("INVACCTFROM");
            w.leaf("BROKERID", broker_id).leaf("ACCTID", &account.number);
            w.close("INVACCTFROM");
            inctran(w, start);
            w.leaf("INCOO", "Y");
            w.open("INCPOS")
                .leaf("DTASOF", &now.format(OFX_DATETIME).to_string())
                .leaf("INCLUDE", "Y")
                .close("INCPOS");
            w.leaf("INCBAL", "Y");
            w.close("INVSTMTRQ").close("INVSTMTTRNRQ").close("INVSTMTMSGSRQV1");
        }
    })
}
