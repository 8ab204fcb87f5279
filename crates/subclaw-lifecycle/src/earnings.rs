//! Earnings report over the cached records.

use chrono::{Datelike, NaiveDate};
use subclaw_core::types::ClientRecord;

use crate::engine::Lifecycle;

pub const NO_TRANSACTIONS: &str = "No hay transacciones registradas para este período.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Month,
    All,
}

impl Period {
    /// `hoy`/`today` and `mes`/`month`; anything else means all records.
    pub fn parse(arg: &str) -> Self {
        match arg.trim().to_lowercase().as_str() {
            "hoy" | "today" => Period::Today,
            "mes" | "month" => Period::Month,
            _ => Period::All,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Period::Today => "Hoy",
            Period::Month => "Este mes",
            Period::All => "Total",
        }
    }

    fn includes(self, expiration: Option<NaiveDate>, today: NaiveDate) -> bool {
        match self {
            Period::All => true,
            Period::Today => expiration == Some(today),
            Period::Month => expiration
                .is_some_and(|d| d.year() == today.year() && d.month() == today.month()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarningsReport {
    pub period: Period,
    pub transactions: usize,
    pub sales: f64,
    pub purchases: f64,
}

impl EarningsReport {
    /// `None` when no record falls in the period.
    pub fn compute(records: &[ClientRecord], period: Period, today: NaiveDate) -> Option<Self> {
        let mut report = Self {
            period,
            transactions: 0,
            sales: 0.0,
            purchases: 0.0,
        };
        for c in records.iter().filter(|c| period.includes(c.expiration_date, today)) {
            report.transactions += 1;
            report.sales += c.sale_price_dop;
            report.purchases += c.purchase_price_dop;
        }
        (report.transactions > 0).then_some(report)
    }

    pub fn net(&self) -> f64 {
        self.sales - self.purchases
    }

    pub fn render(&self) -> String {
        format!(
            "📊 *Reporte de ganancias ({})*\n\n\
             Transacciones: {}\n\
             💰 Ventas: RD${:.2}\n\
             🛒 Compras: RD${:.2}\n\
             📈 Ganancia neta: RD${:.2}",
            self.period.title(),
            self.transactions,
            self.sales,
            self.purchases,
            self.net()
        )
    }
}

impl Lifecycle {
    pub fn earnings_report(&self, period: Period) -> String {
        let snapshot = self.cache().snapshot();
        match EarningsReport::compute(snapshot.records(), period, self.today()) {
            Some(report) => report.render(),
            None => NO_TRANSACTIONS.to_string(),
        }
    }
}
