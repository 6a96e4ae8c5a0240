use crate::{bootstrap::AppConfig, presenter::LedgerPresenter};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use splitledger_application::{
    Actor, Clock, ExpensePatch, GroupStore, LedgerConfig, LedgerError, LedgerService,
    LedgerStore, NewExpense, NewGroup, NewSettlement, SettlementStore,
};
use splitledger_domain::{
    CurrencyCode, EntryId, GroupId, GroupSettings, GroupType, MemberSnapshot, Money,
    PaymentMethod, Role, SettlementId, SettlementPatch, SettlementStatus, SplitMethod,
    SplitRequest, UserId,
};
use splitledger_infrastructure::{
    FixedClock, InMemoryGroupStore, InMemoryLedgerStore, InMemorySettlementStore,
    RandomIdGenerator, StaticUserDirectory, SystemClock,
};
use std::{
    collections::HashMap,
    fmt::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid scenario file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Step {step}: unknown {kind} `{alias}`")]
    UnknownAlias {
        step: usize,
        kind: &'static str,
        alias: String,
    },
}

/// A recorded sequence of ledger operations, replayed against in-memory
/// stores.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub users: Vec<ScenarioUser>,
    /// Pins the clock so replays are reproducible.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    CreateGroup(CreateGroupStep),
    AddMembers(AddMembersStep),
    RemoveMember(MemberStep),
    SetRole(SetRoleStep),
    AddExpense(AddExpenseStep),
    SettleExpense(ExpenseStep),
    ApproveExpense(ExpenseStep),
    DeleteExpense(ExpenseStep),
    DeclareSettlement(DeclareSettlementStep),
    TransitionSettlement(TransitionStep),
    Report(GroupStep),
    Dashboard(GroupStep),
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::CreateGroup(_) => "createGroup",
            Step::AddMembers(_) => "addMembers",
            Step::RemoveMember(_) => "removeMember",
            Step::SetRole(_) => "setRole",
            Step::AddExpense(_) => "addExpense",
            Step::SettleExpense(_) => "settleExpense",
            Step::ApproveExpense(_) => "approveExpense",
            Step::DeleteExpense(_) => "deleteExpense",
            Step::DeclareSettlement(_) => "declareSettlement",
            Step::TransitionSettlement(_) => "transitionSettlement",
            Step::Report(_) => "report",
            Step::Dashboard(_) => "dashboard",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupStep {
    pub actor: UserId,
    pub alias: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group_type: GroupType,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub default_split_method: SplitMethod,
    #[serde(default)]
    pub settings: GroupSettings,
    #[serde(default)]
    pub member_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersStep {
    pub actor: UserId,
    pub group: String,
    pub emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStep {
    pub actor: UserId,
    pub group: String,
    pub member: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleStep {
    pub actor: UserId,
    pub group: String,
    pub member: UserId,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExpenseStep {
    pub actor: UserId,
    pub group: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub paid_by: Option<UserId>,
    #[serde(default)]
    pub split: Option<SplitRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseStep {
    pub actor: UserId,
    pub expense: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclareSettlementStep {
    pub actor: UserId,
    pub group: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub from: UserId,
    pub to: UserId,
    pub amount: Money,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: String,
    /// Expense aliases this transfer pays off.
    #[serde(default)]
    pub covers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionStep {
    pub actor: UserId,
    pub settlement: String,
    pub status: SettlementStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStep {
    pub actor: UserId,
    pub group: String,
}

/// What a replay produced.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub output: String,
    pub applied: usize,
    pub rejected: usize,
}

pub async fn replay_file(path: &Path, config: &AppConfig) -> Result<ReplayReport, ScenarioError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let scenario: Scenario = serde_json::from_str(&raw)?;
    tracing::info!(
        path = %path.display(),
        users = scenario.users.len(),
        steps = scenario.steps.len(),
        "Loaded scenario"
    );
    replay(scenario, config).await
}

pub async fn replay(scenario: Scenario, config: &AppConfig) -> Result<ReplayReport, ScenarioError> {
    let directory: StaticUserDirectory = scenario
        .users
        .iter()
        .map(|user| MemberSnapshot::new(user.id.clone(), &user.name, &user.email))
        .collect();
    let clock: Arc<dyn Clock> = match scenario.now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    };
    let service = LedgerService::new(
        InMemoryGroupStore::new(),
        InMemoryLedgerStore::new(),
        InMemorySettlementStore::new(),
        Arc::new(directory),
        Arc::new(RandomIdGenerator::new(config.id_length)),
        clock,
        LedgerConfig {
            max_id_attempts: config.id_attempts,
        },
    );

    let mut runner = ScenarioRunner::new(service);
    for (idx, step) in scenario.steps.into_iter().enumerate() {
        runner.apply(idx + 1, step).await?;
    }
    Ok(runner.report)
}

struct ScenarioRunner<G, L, S> {
    service: LedgerService<G, L, S>,
    groups: HashMap<String, GroupId>,
    expenses: HashMap<String, EntryId>,
    settlements: HashMap<String, SettlementId>,
    report: ReplayReport,
}

impl<G, L, S> ScenarioRunner<G, L, S>
where
    G: GroupStore,
    L: LedgerStore,
    S: SettlementStore,
{
    fn new(service: LedgerService<G, L, S>) -> Self {
        Self {
            service,
            groups: HashMap::new(),
            expenses: HashMap::new(),
            settlements: HashMap::new(),
            report: ReplayReport::default(),
        }
    }

    /// Runs one step. Ledger errors are reported and the replay continues;
    /// only malformed references abort it.
    async fn apply(&mut self, step_no: usize, step: Step) -> Result<(), ScenarioError> {
        let name = step.name();
        match self.execute(step_no, step).await? {
            Ok(()) => self.report.applied += 1,
            Err(err) => {
                tracing::warn!(step = step_no, action = name, error = %err, "Step rejected");
                let _ = writeln!(self.report.output, "step {step_no} ({name}) rejected: {err}");
                self.report.rejected += 1;
            }
        }
        Ok(())
    }

    async fn execute(
        &mut self,
        step_no: usize,
        step: Step,
    ) -> Result<Result<(), LedgerError>, ScenarioError> {
        let outcome = match step {
            Step::CreateGroup(step) => {
                let request = NewGroup {
                    name: step.name,
                    description: step.description,
                    group_type: step.group_type,
                    currency: step.currency,
                    default_split_method: step.default_split_method,
                    settings: step.settings,
                    member_emails: step.member_emails,
                };
                self.service
                    .create_group(&Actor::new(step.actor), request)
                    .await
                    .map(|created| {
                        for email in &created.not_found_emails {
                            let _ = writeln!(
                                self.report.output,
                                "step {step_no}: no registered user for {email}"
                            );
                        }
                        self.groups.insert(step.alias, created.group.id);
                    })
            }
            Step::AddMembers(step) => {
                let group = self.group(step_no, &step.group)?;
                self.service
                    .add_members(&Actor::new(step.actor), &group, &step.emails)
                    .await
                    .map(|_| ())
            }
            Step::RemoveMember(step) => {
                let group = self.group(step_no, &step.group)?;
                self.service
                    .remove_member(&Actor::new(step.actor), &group, &step.member)
                    .await
                    .map(|_| ())
            }
            Step::SetRole(step) => {
                let group = self.group(step_no, &step.group)?;
                self.service
                    .set_member_role(&Actor::new(step.actor), &group, &step.member, step.role)
                    .await
                    .map(|_| ())
            }
            Step::AddExpense(step) => {
                let request = NewExpense {
                    group_id: self.group(step_no, &step.group)?,
                    name: step.name,
                    description: step.description,
                    amount: step.amount,
                    category: step.category,
                    date: step.date,
                    paid_by: step.paid_by,
                    split: step.split,
                };
                self.service
                    .record_expense(&Actor::new(step.actor), request)
                    .await
                    .map(|entry| {
                        if let Some(alias) = step.alias {
                            self.expenses.insert(alias, entry.id);
                        }
                    })
            }
            Step::SettleExpense(step) => {
                let expense = self.expense(step_no, &step.expense)?;
                let patch = ExpensePatch {
                    is_settled: Some(true),
                    ..ExpensePatch::default()
                };
                self.service
                    .update_expense(&Actor::new(step.actor), &expense, patch)
                    .await
                    .map(|_| ())
            }
            Step::ApproveExpense(step) => {
                let expense = self.expense(step_no, &step.expense)?;
                self.service
                    .approve_expense(&Actor::new(step.actor), &expense)
                    .await
                    .map(|_| ())
            }
            Step::DeleteExpense(step) => {
                let expense = self.expense(step_no, &step.expense)?;
                self.service
                    .delete_expense(&Actor::new(step.actor), &expense)
                    .await
            }
            Step::DeclareSettlement(step) => {
                let covered_entries = step
                    .covers
                    .iter()
                    .map(|alias| self.expense(step_no, alias))
                    .collect::<Result<Vec<_>, _>>()?;
                let request = NewSettlement {
                    group_id: self.group(step_no, &step.group)?,
                    from: step.from,
                    to: step.to,
                    amount: step.amount,
                    payment_method: step.payment_method,
                    notes: step.notes,
                    covered_entries,
                };
                self.service
                    .declare_settlement(&Actor::new(step.actor), request)
                    .await
                    .map(|settlement| {
                        if let Some(alias) = step.alias {
                            self.settlements.insert(alias, settlement.id);
                        }
                    })
            }
            Step::TransitionSettlement(step) => {
                let settlement = self.settlement(step_no, &step.settlement)?;
                let details = SettlementPatch {
                    payment_method: step.payment_method,
                    notes: step.notes,
                };
                self.service
                    .transition_settlement(
                        &Actor::new(step.actor),
                        &settlement,
                        step.status,
                        details,
                    )
                    .await
                    .map(|_| ())
            }
            Step::Report(step) => {
                let group_id = self.group(step_no, &step.group)?;
                let actor = Actor::new(step.actor);
                match self.service.get_group(&actor, &group_id).await {
                    Ok(group) => self
                        .service
                        .suggest_settlements(&actor, &group_id)
                        .await
                        .map(|plan| {
                            self.report
                                .output
                                .push_str(&LedgerPresenter::plan(&group, &plan));
                        }),
                    Err(err) => Err(err),
                }
            }
            Step::Dashboard(step) => {
                let group_id = self.group(step_no, &step.group)?;
                self.service
                    .group_dashboard(&Actor::new(step.actor), &group_id)
                    .await
                    .map(|dashboard| {
                        self.report
                            .output
                            .push_str(&LedgerPresenter::dashboard(&dashboard));
                    })
            }
        };
        Ok(outcome)
    }

    fn group(&self, step: usize, alias: &str) -> Result<GroupId, ScenarioError> {
        lookup(&self.groups, step, "group", alias)
    }

    fn expense(&self, step: usize, alias: &str) -> Result<EntryId, ScenarioError> {
        lookup(&self.expenses, step, "expense", alias)
    }

    fn settlement(&self, step: usize, alias: &str) -> Result<SettlementId, ScenarioError> {
        lookup(&self.settlements, step, "settlement", alias)
    }
}

fn lookup<T: Clone>(
    table: &HashMap<String, T>,
    step: usize,
    kind: &'static str,
    alias: &str,
) -> Result<T, ScenarioError> {
    table.get(alias).cloned().ok_or_else(|| ScenarioError::UnknownAlias {
        step,
        kind,
        alias: alias.to_string(),
    })
}
