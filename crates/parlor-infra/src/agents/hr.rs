//! HR self-service persona: employee lookup and leave requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};

use parlor_core::agent::AgentDefinition;
use parlor_core::tool::{ToolArguments, ToolSpec, tool_fn};
use parlor_types::agent::{MemoryPolicy, PlaceholderSpec};
use parlor_types::error::AgentBuildError;
use parlor_types::tool::{DomainError, ParamType};

pub const AGENT_NAME: &str = "hr";

const SYSTEM_PROMPT: &str = "\
You are an HR assistant for employees of {company}. \
Answer questions about employees and leave politely and concisely. \
Always confirm the employee id before submitting a leave request, \
and report the remaining balance after every request.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: String,
    pub title: String,
    pub manager: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub annual: u32,
    pub sick: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
}

impl LeaveType {
    fn parse(raw: &str) -> Result<Self, DomainError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "annual" | "vacation" => Ok(LeaveType::Annual),
            "sick" => Ok(LeaveType::Sick),
            other => Err(DomainError::bad_input(format!(
                "unknown leave type '{other}', expected 'annual' or 'sick'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub request_id: String,
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
}

/// Simulated HR system of record.
#[derive(Debug, Default)]
pub struct HrDirectory {
    employees: DashMap<String, Employee>,
    balances: DashMap<String, LeaveBalance>,
    requests: DashMap<String, LeaveRequest>,
    next_request: AtomicU64,
}

impl HrDirectory {
    pub fn seeded() -> Self {
        let directory = Self::default();
        let seed = [
            ("E1001", "Alice Chen", "Engineering", "Staff Engineer", None, 18, 10),
            ("E1002", "Bob Martinez", "Engineering", "Engineering Manager", None, 22, 10),
            ("E1003", "Carol Singh", "People", "HR Partner", Some("E1002"), 15, 8),
        ];
        for (id, name, department, title, manager, annual, sick) in seed {
            directory.add_employee(
                Employee {
                    id: id.to_string(),
                    name: name.to_string(),
                    department: department.to_string(),
                    title: title.to_string(),
                    manager: manager.map(str::to_string),
                },
                LeaveBalance { annual, sick },
            );
        }
        directory
    }

    pub fn add_employee(&self, employee: Employee, balance: LeaveBalance) {
        self.balances.insert(employee.id.clone(), balance);
        self.employees.insert(employee.id.clone(), employee);
    }

    pub fn employee(&self, id: &str) -> Result<Employee, DomainError> {
        self.employees
            .get(&normalize_id(id))
            .map(|e| e.clone())
            .ok_or_else(|| DomainError::not_found(format!("Employee {id} not found")))
    }

    pub fn balance(&self, id: &str) -> Result<LeaveBalance, DomainError> {
        self.balances
            .get(&normalize_id(id))
            .map(|b| *b)
            .ok_or_else(|| DomainError::not_found(format!("Employee {id} not found")))
    }

    /// Deduct an inclusive date range from the employee's balance.
    pub fn request_leave(
        &self,
        id: &str,
        leave_type: LeaveType,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(LeaveRequest, LeaveBalance), DomainError> {
        if end < start {
            return Err(DomainError::bad_input(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let days = u32::try_from((end - start).num_days() + 1)
            .map_err(|_| DomainError::bad_input("leave range is too long"))?;

        let employee_id = normalize_id(id);
        let mut balance = self
            .balances
            .get_mut(&employee_id)
            .ok_or_else(|| DomainError::not_found(format!("Employee {id} not found")))?;

        let available = match leave_type {
            LeaveType::Annual => &mut balance.annual,
            LeaveType::Sick => &mut balance.sick,
        };
        if *available < days {
            return Err(DomainError::conflict(format!(
                "insufficient leave: {days} days requested, {} available",
                *available
            )));
        }
        *available -= days;
        let remaining = *balance;
        drop(balance);

        let n = self.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        let request = LeaveRequest {
            request_id: format!("LR-{n:04}"),
            employee_id,
            leave_type,
            start_date: start,
            end_date: end,
            days,
        };
        self.requests.insert(request.request_id.clone(), request.clone());
        Ok((request, remaining))
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

async fn get_employee(hr: Arc<HrDirectory>, args: ToolArguments) -> Result<Value, DomainError> {
    let employee = hr.employee(args.str("employeeId")?)?;
    Ok(serde_json::to_value(employee).unwrap_or(Value::Null))
}

async fn get_leave_balance(hr: Arc<HrDirectory>, args: ToolArguments) -> Result<Value, DomainError> {
    let id = args.str("employeeId")?;
    let balance = hr.balance(id)?;
    Ok(json!({ "employeeId": normalize_id(id), "annual": balance.annual, "sick": balance.sick }))
}

async fn request_leave(hr: Arc<HrDirectory>, args: ToolArguments) -> Result<Value, DomainError> {
    let leave_type = LeaveType::parse(args.opt_str("leaveType").unwrap_or("annual"))?;
    let (request, remaining) = hr.request_leave(
        args.str("employeeId")?,
        leave_type,
        args.date("startDate")?,
        args.date("endDate")?,
    )?;
    tracing::info!(
        employee = %request.employee_id,
        request = %request.request_id,
        days = request.days,
        "leave requested"
    );
    Ok(json!({ "request": request, "remaining": remaining }))
}

pub fn tools(hr: &Arc<HrDirectory>) -> Vec<ToolSpec> {
    let h = Arc::clone(hr);
    let employee = ToolSpec::new(
        "get_employee",
        "Look up an employee profile by id",
        tool_fn(move |args| get_employee(Arc::clone(&h), args)),
    )
    .required("employeeId", ParamType::String, "Employee id, e.g. E1001");

    let h = Arc::clone(hr);
    let balance = ToolSpec::new(
        "get_leave_balance",
        "Remaining annual and sick leave days for an employee",
        tool_fn(move |args| get_leave_balance(Arc::clone(&h), args)),
    )
    .required("employeeId", ParamType::String, "Employee id");

    let h = Arc::clone(hr);
    let request = ToolSpec::new(
        "request_leave",
        "Submit a leave request for an inclusive date range",
        tool_fn(move |args| request_leave(Arc::clone(&h), args)),
    )
    .required("employeeId", ParamType::String, "Employee id")
    .required("startDate", ParamType::Date, "First day of leave (YYYY-MM-DD)")
    .required("endDate", ParamType::Date, "Last day of leave (YYYY-MM-DD)")
    .optional("leaveType", ParamType::String, "'annual' (default) or 'sick'");

    vec![employee, balance, request]
}

pub fn agent(hr: Arc<HrDirectory>, recall_size: usize) -> Result<AgentDefinition, AgentBuildError> {
    let mut builder = AgentDefinition::builder(AGENT_NAME)
        .description("HR self-service: employee profiles, leave balances and leave requests")
        .system_prompt(SYSTEM_PROMPT)
        .placeholder(PlaceholderSpec::with_default("company", "Parlor Inc."))
        .memory(MemoryPolicy::PerConversation { recall_size });
    for spec in tools(&hr) {
        builder = builder.tool(spec);
    }
    builder.build()
}
