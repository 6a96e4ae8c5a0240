mod text_table;

use splitledger_application::GroupDashboard;
use splitledger_domain::{Group, MemberBalances, Money, SettlementPlan, SuggestedTransfer};
use std::{borrow::Cow, fmt::Write};
use text_table::{Alignment, TextTableBuilder};

const BALANCE_HEADERS: &[&str] = &["Member", "Paid", "Owed", "Balance"];
const BALANCE_ALIGNMENTS: &[Alignment] = &[
    Alignment::Left,
    Alignment::Right,
    Alignment::Right,
    Alignment::Right,
];
const TRANSFER_HEADERS: &[&str] = &["From", "To", "Amount"];
const TRANSFER_ALIGNMENTS: &[Alignment] = &[Alignment::Left, Alignment::Left, Alignment::Right];
const SETTLED_UP: &str = "Everyone is settled up.";

/// Renders ledger views as plain text for the terminal.
pub struct LedgerPresenter;

impl LedgerPresenter {
    pub fn plan(group: &Group, plan: &SettlementPlan) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {} ({}) ==", group.name, group.currency);
        out.push_str(&Self::balances(&plan.balances));
        out.push('\n');
        out.push_str(&Self::suggestions(&plan.suggestions));
        out
    }

    pub fn balances(balances: &MemberBalances) -> String {
        let mut table = TextTableBuilder::new()
            .alignments(BALANCE_ALIGNMENTS)
            .headers(BALANCE_HEADERS);
        for balance in balances.values() {
            table = table.row([
                Cow::Borrowed(balance.member.name.as_str()),
                Cow::Owned(balance.total_paid.to_string()),
                Cow::Owned(balance.total_owed.to_string()),
                Cow::Owned(signed(balance.balance)),
            ]);
        }
        table.build()
    }

    pub fn suggestions(transfers: &[SuggestedTransfer]) -> String {
        if transfers.is_empty() {
            return format!("{SETTLED_UP}\n");
        }
        let mut table = TextTableBuilder::new()
            .alignments(TRANSFER_ALIGNMENTS)
            .headers(TRANSFER_HEADERS);
        for transfer in transfers {
            table = table.row([
                Cow::Borrowed(transfer.from.name.as_str()),
                Cow::Borrowed(transfer.to.name.as_str()),
                Cow::Owned(transfer.amount.to_string()),
            ]);
        }
        table.build()
    }

    pub fn dashboard(dashboard: &GroupDashboard) -> String {
        let stats = &dashboard.stats;
        let mut out = String::new();
        let _ = writeln!(out, "== {} dashboard ==", dashboard.group.name);
        let _ = writeln!(
            out,
            "Expenses: {} totalling {} ({} settled for {}, {} open)",
            stats.total_expense_count,
            stats.total_expenses,
            stats.settled_expense_count,
            stats.total_settled,
            stats.unsettled_expenses
        );
        let _ = writeln!(
            out,
            "Settlements: {} pending, {} completed",
            stats.pending_settlements, stats.completed_settlements
        );
        let balance = &dashboard.user_balance;
        let _ = writeln!(
            out,
            "{}: paid {}, owes {}, balance {}",
            balance.member.name,
            balance.total_paid,
            balance.total_owed,
            signed(balance.balance)
        );
        out
    }
}

/// Debtors get a leading `+`, matching the owed-minus-paid convention.
fn signed(amount: Money) -> String {
    if amount.is_positive() {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}
