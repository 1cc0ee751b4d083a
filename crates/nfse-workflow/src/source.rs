// SPDX-FileCopyrightText: 2026 NFSe Arapiraca Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in invoice source and batch numbering.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use nfse_core::{
    Address, BatchNumber, BatchNumberSource, InvoiceRecord, InvoiceSource, NfseError, Payer,
};

const BATCH_NUMBER_FORMAT: &str = "%Y%m%d%H%M%S";

/// A single consulting-services record issued now.
///
/// Stands in for the billing system until one is wired in.
#[derive(Debug, Clone)]
pub struct SampleInvoiceSource {
    municipality_code: String,
}

impl SampleInvoiceSource {
    pub fn new(municipality_code: impl Into<String>) -> Self {
        Self {
            municipality_code: municipality_code.into(),
        }
    }

    fn record(&self) -> InvoiceRecord {
        let taxable_amount = 1000.00;
        let tax_rate = 0.05;
        InvoiceRecord {
            id: "rps_1".into(),
            number: "1".into(),
            series: "1".into(),
            rps_type: 1,
            issued_at: Local::now().naive_local(),
            status: 1,
            description: "Serviços de consultoria em tecnologia da informação".into(),
            service_code: "01.01".into(),
            taxable_amount,
            tax_amount: taxable_amount * tax_rate,
            tax_rate,
            tax_withheld: false,
            municipality_code: self.municipality_code.clone(),
            payer: Payer {
                tax_id: "12345678000195".into(),
                legal_name: "Empresa Tomadora de Serviços Ltda".into(),
                address: Address {
                    street: "Rua das Flores, 123".into(),
                    number: "123".into(),
                    district: "Centro".into(),
                    municipality_code: self.municipality_code.clone(),
                    state: "AL".into(),
                    postal_code: "57300000".into(),
                },
            },
        }
    }
}

#[async_trait]
impl InvoiceSource for SampleInvoiceSource {
    async fn pending_invoices(&self) -> Result<Vec<InvoiceRecord>, NfseError> {
        Ok(vec![self.record()])
    }
}

/// `YYYYMMDDhhmmss` batch numbers from the local clock.
///
/// Two batches in the same second get consecutive seconds, so numbers stay
/// unique and increasing within the process.
#[derive(Debug, Default)]
pub struct ClockBatchNumbers {
    last: Mutex<Option<NaiveDateTime>>,
}

impl ClockBatchNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_after(&self, now: NaiveDateTime) -> BatchNumber {
        let now = now.with_nanosecond(0).unwrap_or(now);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = match *last {
            Some(previous) if now <= previous => previous + TimeDelta::seconds(1),
            _ => now,
        };
        *last = Some(next);
        format_batch_number(next)
    }
}

impl BatchNumberSource for ClockBatchNumbers {
    fn next_batch_number(&self) -> BatchNumber {
        self.next_after(Local::now().naive_local())
    }
}

fn format_batch_number(at: NaiveDateTime) -> BatchNumber {
    // 14 ASCII digits always fit in u64
    let digits = at.format(BATCH_NUMBER_FORMAT).to_string();
    BatchNumber(digits.parse().unwrap_or_default())
}
