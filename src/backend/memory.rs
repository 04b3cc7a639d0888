//! An in-process clinic backend.
//!
//! Implements every procedure the clinic bindings call, over JSON rows kept in memory. The
//! behavior follows the real backend closely enough for demos and integration tests:
//!
//! - the final argument must be the configured license key,
//! - paged lists answer `{<items key>: [...], current_page, total_pages, total_count, page_size}`,
//! - unpaged lists answer a bare array,
//! - validation failures come back as structured `{"error": {"message": ...}}` values,
//! - `ValidateLicense` answers a verdict for any key instead of rejecting the call,
//! - invoices are numbered `INV-001`, `INV-002`, ... and payments `Payment-001`, ...
//!
//! Dates are compared as `YYYY-MM-DD` text against the backend's own "today", which tests can
//! pin with [`InMemoryBackend::with_today`]. Failures can also be scripted per procedure with
//! [`InMemoryBackend::fail_next`].

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use store_framework::{RpcFailure, RpcTransport};
use tracing::{debug, warn};

/// Page size assumed when a list procedure is not told one.
const SERVER_PAGE_SIZE: u64 = 10;

/// Expiry reported for the accepted license unless configured.
pub const DEFAULT_LICENSE_EXPIRY: &str = "2030-12-31";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Patients,
    Appointments,
    Sessions,
    Invoices,
    Payments,
    LabOrders,
    Procedures,
    WorkTypes,
    ColorShades,
    DentalLabs,
    ExpenseCategories,
}

impl Table {
    fn noun(self) -> &'static str {
        match self {
            Table::Patients => "patient",
            Table::Appointments => "appointment",
            Table::Sessions => "session",
            Table::Invoices => "invoice",
            Table::Payments => "payment",
            Table::LabOrders => "lab order",
            Table::Procedures => "procedure",
            Table::WorkTypes => "work type",
            Table::ColorShades => "color shade",
            Table::DentalLabs => "dental lab",
            Table::ExpenseCategories => "expense category",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Listing {
    All,
    Paged,
    SessionFilter,
    LabOrderFilter,
}

#[derive(Debug, Clone, Copy)]
enum UpdateLayout {
    Record,
    IdThenRecord,
    SessionWithItems,
}

#[derive(Debug, Clone, Copy)]
enum Route {
    List {
        table: Table,
        key: &'static str,
        listing: Listing,
    },
    Create {
        table: Table,
        stamped: bool,
    },
    Update {
        table: Table,
        layout: UpdateLayout,
    },
    Delete {
        table: Table,
    },
    Get {
        table: Table,
    },
    Invoicing(Invoicing),
}

#[derive(Debug, Clone, Copy)]
enum Invoicing {
    Overview,
    BySession,
    Preview,
    Create,
    PaymentDetails,
    CreatePayment,
}

fn route(procedure: &str) -> Option<Route> {
    use Listing::*;
    use Table::*;
    use UpdateLayout::*;

    let list = |table, key, listing| Route::List {
        table,
        key,
        listing,
    };
    let create = |table, stamped| Route::Create { table, stamped };
    let update = |table, layout| Route::Update { table, layout };
    let delete = |table| Route::Delete { table };
    let get = |table| Route::Get { table };

    Some(match procedure {
        "GetPatients" => list(Patients, "patients", All),
        "AddPatient" => create(Patients, false),
        "UpdatePatient" => update(Patients, Record),
        "DeletePatient" => delete(Patients),

        "GetAppointments" => list(Appointments, "appointments", All),
        "AddAppointment" => create(Appointments, false),
        "UpdateAppointment" => update(Appointments, Record),
        "DeleteAppointment" => delete(Appointments),

        "GetSessions" => list(Sessions, "sessions", SessionFilter),
        "GetSession" => get(Sessions),
        "CreateSession" => create(Sessions, false),
        "UpdateSession" => update(Sessions, SessionWithItems),
        "DeleteSession" => delete(Sessions),

        "GetInvoices" => list(Invoices, "invoices", Paged),
        "GetInvoicePayments" => list(Payments, "payments", Paged),
        "GetInvoiceOverview" => Route::Invoicing(Invoicing::Overview),
        "GetInvoiceBySession" => Route::Invoicing(Invoicing::BySession),
        "PreviewInvoice" => Route::Invoicing(Invoicing::Preview),
        "CreateInvoice" => Route::Invoicing(Invoicing::Create),
        "GetInvoicePaymentDetails" => Route::Invoicing(Invoicing::PaymentDetails),
        "CreateInvoicePayment" => Route::Invoicing(Invoicing::CreatePayment),

        "GetLabOrdersPaginated" => list(LabOrders, "orders", LabOrderFilter),
        "GetLabOrder" => get(LabOrders),
        "CreateLabOrder" => create(LabOrders, true),

        "GetProceduresPaginated" => list(Procedures, "procedures", Paged),
        "CreateProcedure" => create(Procedures, false),
        "UpdateProcedure" => update(Procedures, Record),
        "DeleteProcedure" => delete(Procedures),

        "GetWorkTypesPaginated" => list(WorkTypes, "work_types", Paged),
        "CreateWorkType" => create(WorkTypes, true),
        "UpdateWorkType" => update(WorkTypes, IdThenRecord),
        "DeleteWorkType" => delete(WorkTypes),

        "GetColorShadesPaginated" => list(ColorShades, "color_shades", Paged),
        "CreateColorShade" => create(ColorShades, true),
        "UpdateColorShade" => update(ColorShades, IdThenRecord),
        "DeleteColorShade" => delete(ColorShades),

        "GetDentalLabsPaginated" => list(DentalLabs, "labs", Paged),
        "GetDentalLab" => get(DentalLabs),
        "CreateDentalLab" => create(DentalLabs, false),
        "UpdateDentalLab" => update(DentalLabs, IdThenRecord),
        "DeleteDentalLab" => delete(DentalLabs),

        "GetExpenseCategoriesPaginated" => list(ExpenseCategories, "categories", Paged),
        "CreateExpenseCategory" => create(ExpenseCategories, true),
        "UpdateExpenseCategory" => update(ExpenseCategories, IdThenRecord),
        "DeleteExpenseCategory" => delete(ExpenseCategories),

        _ => return None,
    })
}

#[derive(Debug, Default)]
struct Rows {
    rows: BTreeMap<i64, Value>,
    last_id: i64,
}

impl Rows {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<Table, Rows>,
    failures: VecDeque<(String, RpcFailure)>,
}

impl State {
    fn rows(&mut self, table: Table) -> &mut Rows {
        self.tables.entry(table).or_default()
    }

    fn listed(&self, table: Table) -> Vec<Value> {
        self.tables
            .get(&table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn row(&self, table: Table, id: i64) -> Option<&Value> {
        self.tables.get(&table)?.rows.get(&id)
    }

    fn invoice_of_session(&self, session_id: i64) -> Option<Value> {
        self.listed(Table::Invoices)
            .into_iter()
            .find(|row| row.get("session_id").and_then(Value::as_i64) == Some(session_id))
    }

    /// The next `<prefix><NNN>` code after the highest one in `column`.
    fn next_code(&self, table: Table, column_name: &str, prefix: &str) -> String {
        let last = self
            .listed(table)
            .iter()
            .filter_map(|row| column(row, column_name).strip_prefix(prefix)?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("{prefix}{:03}", last + 1)
    }

    fn payment_details(&self, invoice_id: i64) -> Result<Value, RpcFailure> {
        let invoice = self
            .row(Table::Invoices, invoice_id)
            .cloned()
            .ok_or_else(|| RpcFailure::text("invoice not found"))?;
        let payments: Vec<Value> = self
            .listed(Table::Payments)
            .into_iter()
            .filter(|row| row.get("invoice_id").and_then(Value::as_i64) == Some(invoice_id))
            .collect();
        let total_paid: i64 = payments.iter().map(|row| amount(row, "amount")).sum();
        let total = amount(&invoice, "total_amount");
        let status = column(&invoice, "status").to_string();
        let patient_name = match column(&invoice, "patient_name") {
            "" => {
                let patient = invoice.get("patient_id").and_then(Value::as_i64);
                self.lookup(Table::Patients, patient, "name")
            }
            name => name.to_string(),
        };
        Ok(json!({
            "allow_payments": matches!(status.as_str(), "issued" | "partially_paid"),
            "invoice": invoice,
            "patient_name": patient_name,
            "status": status,
            "total_amount": total,
            "payments": payments,
            "total_paid": total_paid,
            "remaining": total - total_paid,
        }))
    }

    /// A text column of another row, or `""`.
    fn lookup(&self, table: Table, id: Option<i64>, column: &str) -> String {
        id.and_then(|id| self.tables.get(&table)?.rows.get(&id))
            .and_then(|row| row.get(column))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

fn structured(message: impl Into<String>) -> RpcFailure {
    RpcFailure::Structured(json!({ "error": { "message": message.into() } }))
}

fn arg_u64(args: &[Value], index: usize, name: &str) -> Result<u64, RpcFailure> {
    args.get(index)
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .ok_or_else(|| RpcFailure::text(format!("invalid {name}")))
}

fn arg_id(args: &[Value], index: usize) -> Result<i64, RpcFailure> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcFailure::text("invalid id"))
}

fn record_id(record: &Map<String, Value>) -> Result<i64, RpcFailure> {
    record
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| RpcFailure::text("invalid id"))
}

fn arg_object(args: &[Value], index: usize) -> Result<Map<String, Value>, RpcFailure> {
    match args.get(index) {
        Some(Value::Object(fields)) => Ok(fields.clone()),
        _ => Err(RpcFailure::text("invalid payload")),
    }
}

fn arg_text(args: &[Value], index: usize) -> String {
    args.get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn paginate(key: &str, rows: Vec<Value>, page: u64, page_size: u64) -> Value {
    let total_count = rows.len() as u64;
    let total_pages = total_count.div_ceil(page_size).max(1);
    let skip = usize::try_from((page - 1) * page_size).unwrap_or(usize::MAX);
    let take = usize::try_from(page_size).unwrap_or(usize::MAX);
    let items: Vec<Value> = rows.into_iter().skip(skip).take(take).collect();
    json!({
        key: items,
        "current_page": page,
        "total_pages": total_pages,
        "total_count": total_count,
        "page_size": page_size,
    })
}

fn column<'a>(row: &'a Value, name: &str) -> &'a str {
    row.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn amount(row: &Value, name: &str) -> i64 {
    row.get(name).and_then(Value::as_i64).unwrap_or(0)
}

/// The `YYYY-MM-DD` part of a date or timestamp column.
fn day<'a>(row: &'a Value, name: &str) -> &'a str {
    let date = column(row, name);
    date.get(..10).unwrap_or(date)
}

/// Days since 1970-01-01 of a `YYYY-MM-DD` date.
fn days_from_civil(date: &str) -> Option<i64> {
    let mut parts = date.get(..10)?.splitn(3, '-');
    let year: i64 = parts.next()?.parse().ok()?;
    let month: i64 = parts.next()?.parse().ok()?;
    let day: i64 = parts.next()?.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let day_of_year = (153 * ((month + 9) % 12) + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    Some(era * 146_097 + day_of_era - 719_468)
}

fn civil_from_days(days: i64) -> String {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let day_of_era = z.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    format!("{year:04}-{month:02}-{day:02}")
}

/// Monday of the week containing `days`.
fn week_start(days: i64) -> i64 {
    // 1970-01-01 was a Thursday.
    days - (days + 3).rem_euclid(7)
}

fn session_matches(session: &Value, filter: &Map<String, Value>) -> bool {
    let same_number = |name: &str| match filter.get(name).and_then(Value::as_i64) {
        Some(wanted) => session.get(name).and_then(Value::as_i64) == Some(wanted),
        None => true,
    };
    let text = |name: &str| filter.get(name).and_then(Value::as_str);
    let date = column(session, "session_date");
    let date = date.get(..10).unwrap_or(date);

    let status_ok = text("status").map_or(true, |s| column(session, "status") == s);
    let from_ok = text("date_from").map_or(true, |from| date >= from);
    let to_ok = text("date_to").map_or(true, |to| date <= to);
    let wanted: Vec<i64> = filter
        .get("procedure_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    let procedures_ok = wanted.is_empty()
        || session
            .get("items")
            .and_then(Value::as_array)
            .is_some_and(|items| {
                items.iter().any(|item| {
                    item.get("procedure_id")
                        .and_then(Value::as_i64)
                        .is_some_and(|id| wanted.contains(&id))
                })
            });

    same_number("patient_id")
        && same_number("dentist_id")
        && status_ok
        && from_ok
        && to_ok
        && procedures_ok
}

fn numbered_items(session_id: i64, items: &[Value]) -> (Vec<Value>, i64) {
    let mut total = 0;
    let items = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut item = item.as_object().cloned().unwrap_or_default();
            total += item.get("amount").and_then(Value::as_i64).unwrap_or(0);
            item.insert("id".into(), json!(index as i64 + 1));
            item.insert("session_id".into(), json!(session_id));
            Value::Object(item)
        })
        .collect();
    (items, total)
}

/// The in-memory backend. One license key is accepted.
#[derive(Debug)]
pub struct InMemoryBackend {
    license: String,
    license_expiry: String,
    today: i64,
    state: Mutex<State>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl InMemoryBackend {
    pub fn new(license: impl Into<String>) -> Self {
        let today = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() / 86_400)
            .unwrap_or_default();
        Self {
            license: license.into(),
            license_expiry: DEFAULT_LICENSE_EXPIRY.to_string(),
            today: i64::try_from(today).unwrap_or_default(),
            state: Mutex::new(State::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_license_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.license_expiry = expiry.into();
        self
    }

    /// Pins the backend's current date (`YYYY-MM-DD`). An unparsable date is ignored.
    pub fn with_today(mut self, date: &str) -> Self {
        match days_from_civil(date) {
            Some(days) => self.today = days,
            None => warn!(date, "Ignoring unparsable date"),
        }
        self
    }

    pub fn today(&self) -> String {
        civil_from_days(self.today)
    }

    fn validate_license(&self, key: &str) -> Value {
        let (is_valid, expiry_date, message) = if key.is_empty() {
            (false, "", "License key is required")
        } else if key == self.license {
            (true, self.license_expiry.as_str(), "License is valid")
        } else {
            (false, "", "Invalid license key format")
        };
        json!({ "is_valid": is_valid, "expiry_date": expiry_date, "message": message })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a row directly, e.g. invoices which have no create procedure here.
    /// A missing or zero `id` is assigned.
    pub fn seed<T: Serialize>(&self, table: Table, row: &T) -> Result<i64, serde_json::Error> {
        let mut row = match serde_json::to_value(row)? {
            Value::Object(fields) => fields,
            other => Map::from_iter([("value".to_string(), other)]),
        };
        let mut state = self.state();
        let rows = state.rows(table);
        let id = match row.get("id").and_then(Value::as_i64) {
            Some(id) if id > 0 => {
                rows.last_id = rows.last_id.max(id);
                id
            }
            _ => rows.next_id(),
        };
        row.insert("id".into(), json!(id));
        rows.rows.insert(id, Value::Object(row));
        Ok(id)
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.state().tables.get(&table).map_or(0, |t| t.rows.len())
    }

    /// Makes the next call of `procedure` fail with `failure`, after the license check.
    pub fn fail_next(&self, procedure: &str, failure: RpcFailure) {
        self.state()
            .failures
            .push_back((procedure.to_string(), failure));
    }

    /// Every procedure invoked so far with its full argument list, credential included.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Argument lists of the calls made to `procedure`.
    pub fn calls_to(&self, procedure: &str) -> Vec<Vec<Value>> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == procedure)
            .map(|(_, args)| args)
            .collect()
    }

    fn dispatch(&self, route: Route, args: &[Value]) -> Result<Value, RpcFailure> {
        let mut state = self.state();
        match route {
            Route::List {
                table,
                key,
                listing,
            } => {
                let rows = state.listed(table);
                Ok(match listing {
                    Listing::All => Value::Array(rows),
                    Listing::Paged => paginate(
                        key,
                        rows,
                        arg_u64(args, 0, "page")?,
                        arg_u64(args, 1, "page size")?,
                    ),
                    Listing::SessionFilter => {
                        let filter = arg_object(args, 1)?;
                        let rows = rows
                            .into_iter()
                            .filter(|row| session_matches(row, &filter))
                            .collect();
                        paginate(key, rows, arg_u64(args, 0, "page")?, SERVER_PAGE_SIZE)
                    }
                    Listing::LabOrderFilter => {
                        let (number, patient, lab, status) = (
                            arg_text(args, 2),
                            arg_text(args, 3),
                            arg_text(args, 4),
                            arg_text(args, 5),
                        );
                        let contains = |row: &Value, name: &str, wanted: &str| {
                            column(row, name).to_lowercase().contains(wanted)
                        };
                        let rows = rows
                            .into_iter()
                            .filter(|row| {
                                contains(row, "order_number", &number)
                                    && contains(row, "patient_name", &patient)
                                    && contains(row, "lab_name", &lab)
                                    && (status.is_empty()
                                        || column(row, "status").to_lowercase() == status)
                            })
                            .collect();
                        paginate(
                            key,
                            rows,
                            arg_u64(args, 0, "page")?,
                            arg_u64(args, 1, "page size")?,
                        )
                    }
                })
            }
            Route::Create { table, stamped } => {
                let mut row = arg_object(args, 0)?;
                if row.get("name").and_then(Value::as_str) == Some("") {
                    return Err(structured(format!("{} name is required", table.noun())));
                }
                let user_id = if stamped { args.get(1).and_then(Value::as_i64) } else { None };
                let id = state.rows(table).next_id();
                row.insert("id".into(), json!(id));
                if let Some(user_id) = user_id {
                    row.insert("created_by".into(), json!(user_id));
                }
                let reply = match table {
                    Table::Sessions => {
                        let items = row.get("items").and_then(Value::as_array).cloned();
                        let (items, total) = numbered_items(id, &items.unwrap_or_default());
                        let patient = row.get("patient_id").and_then(Value::as_i64);
                        row.insert("items".into(), Value::Array(items));
                        row.insert("total_amount".into(), json!(total));
                        row.insert(
                            "patient_name".into(),
                            json!(state.lookup(Table::Patients, patient, "name")),
                        );
                        json!(id)
                    }
                    Table::LabOrders => {
                        let order_number = format!("LAB-{id:04}");
                        let joins = [
                            ("patient_name", Table::Patients, "patient_id"),
                            ("lab_name", Table::DentalLabs, "lab_id"),
                            ("work_type_name", Table::WorkTypes, "work_type_id"),
                        ];
                        for (name, other, reference) in joins {
                            let other_id = row.get(reference).and_then(Value::as_i64);
                            let value = state.lookup(other, other_id, "name");
                            row.insert(name.into(), json!(value));
                        }
                        let status = row.get("status").and_then(Value::as_str).unwrap_or_default();
                        if status.is_empty() {
                            row.insert("status".into(), json!("pending"));
                        }
                        row.insert("order_number".into(), json!(order_number));
                        json!({ "id": id, "order_number": order_number })
                    }
                    _ => json!(id),
                };
                state.rows(table).rows.insert(id, Value::Object(row));
                Ok(reply)
            }
            Route::Update { table, layout } => {
                let (id, changes) = match layout {
                    UpdateLayout::Record => {
                        let record = arg_object(args, 0)?;
                        (record_id(&record)?, record)
                    }
                    UpdateLayout::IdThenRecord => (arg_id(args, 0)?, arg_object(args, 1)?),
                    UpdateLayout::SessionWithItems => {
                        let mut session = arg_object(args, 0)?;
                        let id = record_id(&session)?;
                        let items = args.get(1).and_then(Value::as_array).cloned();
                        let (items, total) = numbered_items(id, &items.unwrap_or_default());
                        session.insert("items".into(), Value::Array(items));
                        session.insert("total_amount".into(), json!(total));
                        (id, session)
                    }
                };
                let noun = table.noun();
                let row = state
                    .rows(table)
                    .rows
                    .get_mut(&id)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| RpcFailure::text(format!("{noun} {id} not found")))?;
                for (name, value) in changes {
                    if name != "id" {
                        row.insert(name, value);
                    }
                }
                Ok(Value::Null)
            }
            Route::Delete { table } => {
                let id = arg_id(args, 0)?;
                match state.rows(table).rows.remove(&id) {
                    Some(_) => Ok(Value::Null),
                    None => Err(RpcFailure::text(format!("{} {id} not found", table.noun()))),
                }
            }
            Route::Get { table } => {
                let id = arg_id(args, 0)?;
                state
                    .row(table, id)
                    .cloned()
                    .ok_or_else(|| RpcFailure::text(format!("{} not found", table.noun())))
            }
            Route::Invoicing(operation) => self.invoicing(&mut state, operation, args),
        }
    }

    fn invoicing(
        &self,
        state: &mut State,
        operation: Invoicing,
        args: &[Value],
    ) -> Result<Value, RpcFailure> {
        let today = self.today();
        match operation {
            Invoicing::Overview => {
                let invoices = state.listed(Table::Invoices);
                let tally = |from: &str| {
                    invoices
                        .iter()
                        .filter(|row| {
                            let date = day(row, "invoice_date");
                            date >= from && date <= today.as_str()
                        })
                        .fold((0, 0), |(total, count), row| {
                            (total + amount(row, "total_amount"), count + 1)
                        })
                };
                let week = civil_from_days(week_start(self.today));
                let month = format!("{}-01", today.get(..7).unwrap_or_default());
                let (today_total, today_count) = tally(today.as_str());
                let (week_total, week_count) = tally(week.as_str());
                let (month_total, month_count) = tally(month.as_str());
                Ok(json!({
                    "today_total": today_total,
                    "today_count": today_count,
                    "week_total": week_total,
                    "week_count": week_count,
                    "month_total": month_total,
                    "month_count": month_count,
                }))
            }
            Invoicing::BySession => {
                let session_id = arg_id(args, 0)?;
                Ok(state.invoice_of_session(session_id).unwrap_or(Value::Null))
            }
            Invoicing::Preview | Invoicing::Create => {
                let session_id = arg_id(args, 0)?;
                if state.invoice_of_session(session_id).is_some() {
                    return Err(RpcFailure::text("invoice already exists for this session"));
                }
                let session = state
                    .row(Table::Sessions, session_id)
                    .cloned()
                    .ok_or_else(|| RpcFailure::text("session not found"))?;
                let patient_id = session.get("patient_id").and_then(Value::as_i64);
                let patient_name = state.lookup(Table::Patients, patient_id, "name");
                let invoice_number = state.next_code(Table::Invoices, "invoice_number", "INV-");
                let total_amount = amount(&session, "total_amount");

                if let Invoicing::Preview = operation {
                    return Ok(json!({
                        "patient_name": patient_name,
                        "session_date": column(&session, "session_date"),
                        "invoice_number": invoice_number,
                        "procedures": session.get("items").cloned().unwrap_or_else(|| json!([])),
                        "total_amount": total_amount,
                    }));
                }

                let rows = state.rows(Table::Invoices);
                let id = rows.next_id();
                let invoice = json!({
                    "id": id,
                    "session_id": session_id,
                    "patient_id": patient_id.unwrap_or_default(),
                    "patient_name": patient_name,
                    "invoice_number": invoice_number,
                    "invoice_date": today,
                    "total_amount": total_amount,
                    "status": "issued",
                    "notes": column(&session, "notes"),
                });
                rows.rows.insert(id, invoice.clone());
                debug!(id, %invoice_number, "Invoice issued");
                Ok(invoice)
            }
            Invoicing::PaymentDetails => state.payment_details(arg_id(args, 0)?),
            Invoicing::CreatePayment => {
                let invoice_id = arg_id(args, 0)?;
                let paid = args.get(1).and_then(Value::as_i64).unwrap_or(0);
                let payment_date = args.get(2).and_then(Value::as_str).unwrap_or_default().trim();
                let note = args.get(3).and_then(Value::as_str).unwrap_or_default();

                if paid <= 0 {
                    return Err(RpcFailure::text("payment amount must be greater than zero"));
                }
                if payment_date.is_empty() {
                    return Err(RpcFailure::text("payment date is required"));
                }
                if payment_date.get(..10).unwrap_or(payment_date) > today.as_str() {
                    return Err(RpcFailure::text("payment date cannot be in the future"));
                }
                let details = state.payment_details(invoice_id)?;
                let status = column(&details, "status");
                if !details["allow_payments"].as_bool().unwrap_or(false) {
                    return Err(RpcFailure::text(format!(
                        "payments are not allowed for invoices with status {status}"
                    )));
                }
                let remaining = amount(&details, "remaining");
                if remaining <= 0 {
                    return Err(RpcFailure::text("invoice is already fully paid"));
                }
                if paid > remaining {
                    return Err(RpcFailure::text("payment exceeds remaining balance"));
                }

                let new_status = if paid == remaining { "paid" } else { "partially_paid" };
                let invoice = &details["invoice"];
                let payment_code = state.next_code(Table::Payments, "payment_code", "Payment-");
                let mut payment = json!({
                    "invoice_id": invoice_id,
                    "patient_id": amount(invoice, "patient_id"),
                    "payment_code": payment_code,
                    "amount": paid,
                    "payment_amount": paid,
                    "payment_date": payment_date,
                    "note": note,
                    "payment_method": "cash",
                    "created_at": today,
                    "updated_at": today,
                    "invoice_number": column(invoice, "invoice_number"),
                    "invoice_amount": amount(invoice, "total_amount"),
                    "invoice_date": column(invoice, "invoice_date"),
                    "invoice_status": new_status,
                    "patient_name": column(&details, "patient_name"),
                });
                let rows = state.rows(Table::Payments);
                let id = rows.next_id();
                payment["id"] = json!(id);
                rows.rows.insert(id, payment);
                if let Some(row) = state
                    .rows(Table::Invoices)
                    .rows
                    .get_mut(&invoice_id)
                    .and_then(Value::as_object_mut)
                {
                    row.insert("status".into(), json!(new_status));
                }
                debug!(invoice_id, %payment_code, new_status, "Payment recorded");
                state.payment_details(invoice_id)
            }
        }
    }
}

#[async_trait]
impl RpcTransport for InMemoryBackend {
    async fn invoke(&self, procedure: &str, mut args: Vec<Value>) -> Result<Value, RpcFailure> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((procedure.to_string(), args.clone()));

        let credential = args.pop();
        let key = credential.as_ref().and_then(Value::as_str).unwrap_or_default();
        let validating = procedure == "ValidateLicense";
        if !validating && key != self.license {
            warn!(procedure, "Rejected call with an invalid license");
            return Err(structured("invalid license key"));
        }

        {
            let mut state = self.state();
            if let Some(index) = state.failures.iter().position(|(p, _)| p == procedure) {
                if let Some((_, failure)) = state.failures.remove(index) {
                    debug!(procedure, "Scripted failure");
                    return Err(failure);
                }
            }
        }

        if validating {
            return Ok(self.validate_license(key));
        }

        let route = route(procedure)
            .ok_or_else(|| RpcFailure::text(format!("unknown procedure {procedure}")))?;
        debug!(procedure, ?route, "Dispatching");
        self.dispatch(route, &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new("key")
    }

    #[tokio::test]
    async fn wrong_license_is_rejected() {
        let failure = backend()
            .invoke("GetPatients", vec![json!("nope")])
            .await
            .unwrap_err();
        assert_eq!(store_framework::normalize_error(&failure), "invalid license key");
    }

    #[tokio::test]
    async fn paged_listing_reports_totals() {
        let backend = backend();
        for n in 0..12 {
            backend
                .seed(Table::Procedures, &json!({ "name": format!("P{n}"), "price": n }))
                .unwrap();
        }

        let reply = backend
            .invoke("GetProceduresPaginated", vec![json!(2), json!(5), json!("key")])
            .await
            .unwrap();

        assert_eq!(reply["procedures"].as_array().map(Vec::len), Some(5));
        assert_eq!(reply["total_pages"], json!(3));
        assert_eq!(reply["total_count"], json!(12));
        assert_eq!(reply["current_page"], json!(2));
    }

    #[tokio::test]
    async fn sessions_filter_by_status_and_procedure() {
        let backend = backend();
        backend
            .invoke(
                "CreateSession",
                vec![
                    json!({ "patient_id": 1, "status": "completed", "session_date": "2024-03-01",
                            "items": [{ "procedure_id": 4, "item_name": "Filling", "amount": 100 }] }),
                    json!("key"),
                ],
            )
            .await
            .unwrap();
        backend
            .invoke(
                "CreateSession",
                vec![
                    json!({ "patient_id": 2, "status": "in-progress", "session_date": "2024-03-05", "items": [] }),
                    json!("key"),
                ],
            )
            .await
            .unwrap();

        let filter = json!({ "patient_id": null, "status": "completed", "dentist_id": null,
                             "date_from": null, "date_to": null, "procedure_ids": [4] });
        let reply = backend
            .invoke("GetSessions", vec![json!(1), filter, json!("key")])
            .await
            .unwrap();

        let sessions = reply["sessions"].as_array().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0]["total_amount"], json!(100));
    }

    #[tokio::test]
    async fn blank_name_is_a_structured_error() {
        let failure = backend()
            .invoke("CreateWorkType", vec![json!({ "name": "" }), json!(1), json!("key")])
            .await
            .unwrap_err();
        assert!(matches!(failure, RpcFailure::Structured(_)));
        assert_eq!(
            store_framework::normalize_error(&failure),
            "work type name is required"
        );
    }

    #[test]
    fn civil_dates_round_trip() {
        assert_eq!(days_from_civil("1970-01-01"), Some(0));
        assert_eq!(days_from_civil("2024-03-01"), Some(19_783));
        assert_eq!(civil_from_days(19_783), "2024-03-01");
        assert_eq!(civil_from_days(days_from_civil("2000-02-29").unwrap()), "2000-02-29");
        assert_eq!(days_from_civil("2024-13-01"), None);
        assert_eq!(days_from_civil("soon"), None);
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2024-05-10 was a Friday, 2024-05-12 a Sunday.
        let friday = days_from_civil("2024-05-10").unwrap();
        let sunday = days_from_civil("2024-05-12").unwrap();
        assert_eq!(civil_from_days(week_start(friday)), "2024-05-06");
        assert_eq!(civil_from_days(week_start(sunday)), "2024-05-06");
        assert_eq!(civil_from_days(week_start(week_start(friday))), "2024-05-06");
    }

    #[tokio::test]
    async fn validation_answers_for_any_key() {
        let backend = backend().with_license_expiry("2031-01-31");

        let valid = backend.invoke("ValidateLicense", vec![json!("key")]).await.unwrap();
        assert_eq!(valid["is_valid"], json!(true));
        assert_eq!(valid["expiry_date"], json!("2031-01-31"));

        let invalid = backend.invoke("ValidateLicense", vec![json!("nope")]).await.unwrap();
        assert_eq!(invalid["is_valid"], json!(false));
        assert_eq!(invalid["message"], json!("Invalid license key format"));
    }

    #[tokio::test]
    async fn get_answers_row_or_not_found() {
        let backend = backend();
        let id = backend.seed(Table::DentalLabs, &json!({ "name": "Smile Lab" })).unwrap();

        let lab = backend.invoke("GetDentalLab", vec![json!(id), json!("key")]).await.unwrap();
        assert_eq!(lab["name"], json!("Smile Lab"));

        let failure = backend
            .invoke("GetDentalLab", vec![json!(99), json!("key")])
            .await
            .unwrap_err();
        assert_eq!(store_framework::normalize_error(&failure), "dental lab not found");
    }

    #[tokio::test]
    async fn overview_buckets_by_day_week_and_month() {
        let backend = backend().with_today("2024-05-10");
        for (date, total) in [
            ("2024-05-10 09:30:00", 100),
            ("2024-05-07", 200),
            ("2024-05-02", 400),
            ("2024-04-30", 800),
            ("2024-05-11", 1600),
        ] {
            backend
                .seed(Table::Invoices, &json!({ "invoice_date": date, "total_amount": total }))
                .unwrap();
        }

        let overview = backend
            .invoke("GetInvoiceOverview", vec![json!("key")])
            .await
            .unwrap();

        assert_eq!(
            overview,
            json!({
                "today_total": 100, "today_count": 1,
                "week_total": 300, "week_count": 2,
                "month_total": 700, "month_count": 3,
            })
        );
    }

    #[tokio::test]
    async fn payments_move_invoice_to_paid() {
        let backend = backend().with_today("2024-05-10");
        let session = backend
            .seed(Table::Sessions, &json!({ "patient_id": 1, "total_amount": 1000 }))
            .unwrap();
        let invoice = backend
            .invoke("CreateInvoice", vec![json!(session), json!("key")])
            .await
            .unwrap();
        assert_eq!(invoice["invoice_number"], json!("INV-001"));
        let invoice_id = invoice["id"].clone();

        let pay = |amount: i64, date: &str| {
            vec![invoice_id.clone(), json!(amount), json!(date), json!(""), json!("key")]
        };
        let details = backend
            .invoke("CreateInvoicePayment", pay(400, "2024-05-09"))
            .await
            .unwrap();
        assert_eq!(details["status"], json!("partially_paid"));
        assert_eq!(details["remaining"], json!(600));
        assert_eq!(details["payments"][0]["payment_code"], json!("Payment-001"));

        let too_much = backend
            .invoke("CreateInvoicePayment", pay(700, "2024-05-10"))
            .await
            .unwrap_err();
        assert_eq!(
            store_framework::normalize_error(&too_much),
            "payment exceeds remaining balance"
        );

        let details = backend
            .invoke("CreateInvoicePayment", pay(600, "2024-05-10"))
            .await
            .unwrap();
        assert_eq!(details["status"], json!("paid"));
        assert_eq!(details["allow_payments"], json!(false));

        let closed = backend
            .invoke("CreateInvoicePayment", pay(1, "2024-05-10"))
            .await
            .unwrap_err();
        assert_eq!(
            store_framework::normalize_error(&closed),
            "payments are not allowed for invoices with status paid"
        );
    }

    #[tokio::test]
    async fn scripted_failure_is_used_once() {
        let backend = backend();
        backend.fail_next("GetPatients", RpcFailure::text("database locked"));

        assert!(backend.invoke("GetPatients", vec![json!("key")]).await.is_err());
        assert!(backend.invoke("GetPatients", vec![json!("key")]).await.is_ok());
    }
}
