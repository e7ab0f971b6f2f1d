use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Percentage};
use crate::errors::{Result, SuiteError};

/// a line as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub designation: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    #[serde(default)]
    pub tax_rate: Option<Percentage>,
    #[serde(default)]
    pub discount: Option<Percentage>,
}

/// computed amounts of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    pub line_subtotal: Money,
    pub line_tax: Money,
    pub line_total: Money,
}

/// invoice level aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub lines: Vec<LineAmounts>,
    pub totals: InvoiceTotals,
}

impl LineInput {
    /// `line` is the 1-based position reported in errors
    fn validate(&self, line: usize) -> Result<()> {
        if self.designation.trim().is_empty() {
            return Err(SuiteError::MissingField { field: "designation" });
        }
        if self.quantity <= Decimal::ZERO {
            return Err(SuiteError::InvalidQuantity {
                line,
                quantity: self.quantity,
            });
        }
        if self.unit_price.is_negative() {
            return Err(SuiteError::NegativeUnitPrice {
                line,
                unit_price: self.unit_price,
            });
        }
        for (field, pct) in [("tax_rate", self.tax_rate), ("discount", self.discount)] {
            if let Some(value) = pct {
                if !value.is_within_bounds() {
                    return Err(SuiteError::PercentageOutOfRange { line, field, value });
                }
            }
        }
        Ok(())
    }

    /// unrounded amounts are carried until the very end, then rounded once
    pub fn amounts(&self) -> Result<LineAmounts> {
        let overflow = || SuiteError::AmountOverflow { context: "line amount" };
        let discount = self.discount.unwrap_or(Percentage::ZERO);
        let tax_rate = self.tax_rate.unwrap_or(Percentage::ZERO);

        let raw_subtotal = self
            .quantity
            .checked_mul(self.unit_price.as_decimal())
            .and_then(|gross| gross.checked_mul(discount.complement()))
            .ok_or_else(overflow)?;
        let raw_tax = raw_subtotal
            .checked_mul(tax_rate.as_fraction())
            .ok_or_else(overflow)?;
        let line_subtotal = Money::from_decimal(raw_subtotal);
        let line_tax = Money::from_decimal(raw_tax);

        Ok(LineAmounts {
            line_subtotal,
            line_tax,
            line_total: line_subtotal.checked_add(line_tax).ok_or_else(overflow)?,
        })
    }
}

/// validate every line and compute per-line and invoice totals
pub fn calculate(lines: &[LineInput]) -> Result<Calculation> {
    if lines.is_empty() {
        return Err(SuiteError::EmptyInvoice);
    }

    let overflow = || SuiteError::AmountOverflow { context: "invoice total" };
    let mut amounts = Vec::with_capacity(lines.len());
    let mut totals = InvoiceTotals::default();
    for (index, line) in lines.iter().enumerate() {
        line.validate(index + 1)?;
        let computed = line.amounts()?;
        totals.subtotal = totals
            .subtotal
            .checked_add(computed.line_subtotal)
            .ok_or_else(overflow)?;
        totals.tax_amount = totals
            .tax_amount
            .checked_add(computed.line_tax)
            .ok_or_else(overflow)?;
        amounts.push(computed);
    }
    totals.total_amount = totals
        .subtotal
        .checked_add(totals.tax_amount)
        .ok_or_else(overflow)?;

    Ok(Calculation {
        lines: amounts,
        totals,
    })
}
