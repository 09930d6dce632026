//! Rendering transaction slips for the 32 column thermal printer.

use time::{OffsetDateTime, macros::format_description};

use crate::money::Money;

/// The number of characters that fit on one line of the receipt paper.
pub const RECEIPT_WIDTH: usize = 32;

const BANK_NAME: &str = "MALOI BANK ATM";

/// The kind of slip to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    /// A balance inquiry, no money moved.
    BalanceInquiry,
    /// A deposit.
    Deposit,
    /// A withdrawal and its fee.
    Withdrawal,
}

impl ReceiptKind {
    fn label(&self) -> &'static str {
        match self {
            ReceiptKind::BalanceInquiry => "BALANCE INQUIRY",
            ReceiptKind::Deposit => "DEPOSIT",
            ReceiptKind::Withdrawal => "WITHDRAWAL",
        }
    }
}

/// The details printed on a transaction slip.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// The kind of transaction.
    pub kind: ReceiptKind,
    /// The card holder's name.
    pub customer: Option<String>,
    /// The amount deposited or withdrawn, if any.
    pub amount: Option<Money>,
    /// The fee charged, if any.
    pub fee: Option<Money>,
    /// The balance after the transaction.
    pub balance: Money,
    /// When the transaction happened.
    pub timestamp: OffsetDateTime,
}

impl Receipt {
    /// A slip for a balance inquiry, dated now.
    pub fn balance_inquiry(customer: Option<String>, balance: Money) -> Self {
        Self {
            kind: ReceiptKind::BalanceInquiry,
            customer,
            amount: None,
            fee: None,
            balance,
            timestamp: now_local(),
        }
    }

    /// A slip for a deposit, dated now.
    pub fn deposit(customer: Option<String>, amount: Money, balance: Money) -> Self {
        Self {
            kind: ReceiptKind::Deposit,
            customer,
            amount: Some(amount),
            fee: None,
            balance,
            timestamp: now_local(),
        }
    }

    /// A slip for a withdrawal, dated now.
    pub fn withdrawal(customer: Option<String>, amount: Money, fee: Money, balance: Money) -> Self {
        Self {
            kind: ReceiptKind::Withdrawal,
            customer,
            amount: Some(amount),
            fee: Some(fee),
            balance,
            timestamp: now_local(),
        }
    }
}

fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Format an amount with thousands separators, e.g. `1,234.50`.
pub fn format_amount(amount: Money) -> String {
    let plain = amount.to_string();
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(unsigned) => ("-", unsigned),
        None => ("", plain.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}.{fraction}")
}

fn center(text: &str) -> String {
    format!("{text:^width$}", width = RECEIPT_WIDTH)
}

fn left_right(left: &str, right: &str) -> String {
    let padding = RECEIPT_WIDTH.saturating_sub(left.len() + right.len());
    format!("{left}{}{right}", " ".repeat(padding))
}

/// Lay out `receipt` as printable lines of at most [RECEIPT_WIDTH] characters,
/// plus trailing blank lines to feed the paper past the cutter.
pub fn render_receipt(receipt: &Receipt) -> String {
    let rule = "=".repeat(RECEIPT_WIDTH);
    let separator = "-".repeat(RECEIPT_WIDTH);
    let date_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let date = receipt
        .timestamp
        .format(&date_format)
        .unwrap_or_else(|_| receipt.timestamp.to_string());

    let mut lines = vec![
        rule.clone(),
        center(BANK_NAME),
        rule.clone(),
        center("OFFICIAL TRANSACTION SLIP"),
        separator.clone(),
        left_right("DATE:", &date),
        separator.clone(),
        left_right("TRANSACTION:", receipt.kind.label()),
        left_right("CUSTOMER:", receipt.customer.as_deref().unwrap_or("-")),
    ];

    if let Some(amount) = receipt.amount {
        lines.push(left_right("AMOUNT:", &format_amount(amount)));
    }

    if let Some(fee) = receipt.fee {
        lines.push(left_right("FEE:", &format_amount(fee)));
    }

    lines.extend([
        left_right("BALANCE:", &format_amount(receipt.balance)),
        separator,
        center("Thank you for banking with us!"),
        center("Visit again soon."),
        rule,
        "\n\n".to_owned(),
    ]);

    lines.join("\n")
}
