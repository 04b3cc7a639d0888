use clinic_stores::backend::{InMemoryBackend, Table, DEFAULT_LICENSE_EXPIRY};
use clinic_stores::config::ClinicConfig;
use clinic_stores::invoicing::MISSING_INVOICE_ID;
use clinic_stores::license::{LicenseManager, LICENSE_KEY};
use clinic_stores::lifecycle::ClinicStores;
use clinic_stores::model::*;
use serde_json::json;
use std::sync::Arc;
use store_framework::{
    CompositeFilter, KeyValueStore, MemoryStorage, RpcFailure, StorageError, StoreError,
};

const LICENSE: &str = "CLINIC-KEY";

struct Clinic {
    backend: Arc<InMemoryBackend>,
    license: Arc<LicenseManager>,
    stores: ClinicStores,
}

fn clinic() -> Clinic {
    clinic_with(ClinicConfig::default())
}

fn clinic_with(config: ClinicConfig) -> Clinic {
    let backend = Arc::new(InMemoryBackend::new(LICENSE));
    let license = Arc::new(LicenseManager::new(Arc::new(MemoryStorage::new())));
    let stores = ClinicStores::new(backend.clone(), license.clone(), &config);
    Clinic {
        backend,
        license,
        stores,
    }
}

fn licensed() -> Clinic {
    let clinic = clinic();
    clinic.license.set_license(LICENSE, Some("2030-01-01")).unwrap();
    clinic
}

fn signed_in() -> Clinic {
    let clinic = licensed();
    clinic
        .license
        .sign_in(User::new(3, "dr.omar", "dentist"), "session")
        .unwrap();
    clinic
}

fn patient(name: &str) -> PatientForm {
    PatientForm {
        name: name.to_string(),
        ..PatientForm::default()
    }
}

// --- License gating ---

#[tokio::test]
async fn test_unlicensed_stores_never_call_backend() {
    let clinic = clinic();

    clinic.stores.patients.load_page(1).await;
    let created = clinic.stores.procedures.create(ProcedureForm::default()).await;

    assert!(!created);
    assert_eq!(
        clinic.stores.patients.snapshot().error.as_deref(),
        Some(StoreError::MissingCredential.to_string().as_str())
    );
    assert!(clinic.backend.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_license_surfaces_backend_message() {
    let clinic = clinic();
    clinic.license.set_license("EXPIRED-KEY", None).unwrap();

    clinic.stores.patients.load_page(1).await;

    let state = clinic.stores.patients.snapshot();
    assert_eq!(state.error.as_deref(), Some("invalid license key"));
    assert!(state.items.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_clear_license_resets_every_store() {
    let clinic = licensed();
    clinic.stores.patients.create(patient("Sara")).await;
    let cleaning = ProcedureForm {
        name: "Cleaning".into(),
        price: 1500,
    };
    clinic.stores.procedures.create(cleaning).await;
    assert_eq!(clinic.stores.patients.snapshot().items.len(), 1);

    clinic.stores.clear_license().unwrap();

    assert!(!clinic.license.has_license());
    assert!(clinic.stores.patients.snapshot().items.is_empty());
    assert!(clinic.stores.procedures.snapshot().success.is_none());

    let calls_before = clinic.backend.calls().len();
    clinic.stores.patients.load_page(1).await;
    assert_eq!(clinic.backend.calls().len(), calls_before);
    assert!(clinic.stores.patients.snapshot().error.is_some());
}

#[tokio::test]
async fn test_license_survives_restart_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClinicConfig {
        storage_path: Some(dir.path().join("preferences.json")),
        ..ClinicConfig::default()
    };

    let first = LicenseManager::new(config.open_storage().unwrap());
    first.set_license(LICENSE, Some("2031-06-30")).unwrap();
    drop(first);

    let backend = Arc::new(InMemoryBackend::new(LICENSE));
    let license = Arc::new(LicenseManager::new(config.open_storage().unwrap()));
    let stores = ClinicStores::new(backend.clone(), license.clone(), &config);

    stores.patients.load_page(1).await;

    assert_eq!(license.account().license_expiry, "2031-06-30");
    assert!(stores.patients.snapshot().error.is_none());
    assert_eq!(backend.calls_to("GetPatients"), vec![vec![json!(LICENSE)]]);
}

#[tokio::test]
async fn test_installed_license_is_validated_and_expiry_refreshed() {
    let clinic = clinic();

    let valid = clinic.stores.install_license(LICENSE, None).await.unwrap();

    assert!(valid);
    let status = clinic.license.status();
    assert!(status.is_valid);
    assert!(!status.checking);
    assert_eq!(status.message, "License is valid");
    assert_eq!(clinic.license.account().license_expiry, DEFAULT_LICENSE_EXPIRY);
    assert_eq!(clinic.backend.calls_to("ValidateLicense"), vec![vec![json!(LICENSE)]]);

    clinic.stores.patients.load_page(1).await;
    assert!(clinic.stores.patients.snapshot().error.is_none());
}

#[tokio::test]
async fn test_rejected_license_is_cleared_with_every_store() {
    let clinic = licensed();
    clinic.stores.patients.create(patient("Sara")).await;
    assert_eq!(clinic.stores.patients.snapshot().items.len(), 1);

    let valid = clinic
        .stores
        .install_license("FORGED-KEY", Some("2099-01-01"))
        .await
        .unwrap();

    assert!(!valid);
    assert!(!clinic.license.has_license());
    assert_eq!(clinic.license.account().license_expiry, "");
    assert_eq!(clinic.license.status().message, "Invalid license key format");
    assert!(clinic.stores.patients.snapshot().items.is_empty());
}

#[tokio::test]
async fn test_failed_validation_call_keeps_license() {
    let clinic = licensed();
    clinic
        .backend
        .fail_next("ValidateLicense", RpcFailure::text("backend unreachable"));

    assert!(!clinic.stores.validate_license().await);

    assert!(clinic.license.has_license());
    let status = clinic.license.status();
    assert!(!status.is_valid);
    assert_eq!(status.message, "Validation error: backend unreachable");
}

#[tokio::test]
async fn test_validation_without_key_never_calls() {
    let clinic = clinic();

    assert!(!clinic.stores.validate_license().await);

    assert_eq!(clinic.license.status().message, "No license key provided");
    assert!(clinic.backend.calls().is_empty());
}

/// Storage that refuses to forget anything.
struct StuckStorage(MemoryStorage);

impl KeyValueStore for StuckStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.0.set(key, value)
    }

    fn remove(&self, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Poisoned)
    }
}

#[tokio::test]
async fn test_clear_license_resets_stores_when_storage_fails() {
    let backend = Arc::new(InMemoryBackend::new(LICENSE));
    let storage = Arc::new(StuckStorage(MemoryStorage::new()));
    let license = Arc::new(LicenseManager::new(storage.clone()));
    let stores = ClinicStores::new(backend, license.clone(), &ClinicConfig::default());
    license.set_license(LICENSE, None).unwrap();
    stores.patients.create(patient("Sara")).await;

    assert!(stores.clear_license().is_err());

    assert!(stores.patients.snapshot().items.is_empty());
    assert!(stores.patients.snapshot().success.is_none());
    // The key survives everywhere rather than only in storage.
    assert_eq!(storage.get(LICENSE_KEY).unwrap().as_deref(), Some(LICENSE));
    assert_eq!(license.account().license_key, LICENSE);
}

// --- Single records ---

#[tokio::test]
async fn test_session_fetched_by_id_and_refreshed_on_update() {
    let clinic = licensed();
    let form = SessionForm {
        patient_id: 1,
        dentist_id: 1,
        session_date: "2024-06-01".into(),
        status: "in-progress".into(),
        ..SessionForm::default()
    };
    assert!(clinic.stores.sessions.create(form).await);
    let id = clinic.stores.sessions.snapshot().items[0].id;

    let session = clinic.stores.sessions.load_item(id).await.unwrap();
    assert_eq!(session.status, "in-progress");
    assert_eq!(clinic.backend.calls_to("GetSession"), vec![vec![json!(id), json!(LICENSE)]]);

    let mut changed = session.clone();
    changed.status = "completed".into();
    assert!(clinic.stores.sessions.update(id, (changed, Vec::new())).await);

    assert_eq!(clinic.stores.sessions.selected().unwrap().status, "completed");
    assert_eq!(clinic.backend.calls_to("GetSession").len(), 2);
}

#[tokio::test]
async fn test_missing_record_reports_backend_text() {
    let clinic = licensed();

    assert!(clinic.stores.dental_labs.load_item(42).await.is_none());

    let state = clinic.stores.dental_labs.snapshot();
    assert_eq!(state.error.as_deref(), Some("dental lab not found"));
    assert!(!state.loading);
    assert_eq!(clinic.stores.dental_labs.selected(), None);
}

#[tokio::test]
async fn test_lab_order_detail() {
    let clinic = signed_in();
    let lab_id = clinic
        .backend
        .seed(Table::DentalLabs, &json!({ "name": "Smile Lab" }))
        .unwrap();
    let form = LabOrderForm {
        lab_id,
        quantity: 2,
        upper_left: "1,2".into(),
        order_date: "2024-05-02".into(),
        ..LabOrderForm::default()
    };
    assert!(clinic.stores.lab_orders.create(form).await);
    let id = clinic.stores.lab_orders.snapshot().items[0].id;

    let detail = clinic.stores.load_lab_order(id).await.unwrap();

    assert_eq!(detail.lab_name, "Smile Lab");
    assert_eq!(detail.upper_left, "1,2");
    assert_eq!(detail.quantity, 2);
    assert_eq!(detail.created_by, 3);
    assert_eq!(clinic.stores.lab_order_detail.value(), Some(detail));
}

// --- Invoicing ---

async fn invoiced_session(clinic: &Clinic) -> i64 {
    let patient_id = clinic
        .backend
        .seed(Table::Patients, &json!({ "name": "Sara Haddad" }))
        .unwrap();
    let form = SessionForm {
        patient_id,
        dentist_id: 1,
        session_date: "2024-05-09".into(),
        status: "completed".into(),
        items: vec![
            SessionItemForm {
                procedure_id: Some(1),
                item_name: "Filling".into(),
                amount: 3000,
            },
            SessionItemForm {
                procedure_id: None,
                item_name: "X-ray".into(),
                amount: 500,
            },
        ],
        ..SessionForm::default()
    };
    assert!(clinic.stores.sessions.create(form).await);
    clinic.stores.sessions.snapshot().items[0].id
}

#[tokio::test]
async fn test_session_is_previewed_then_invoiced_once() {
    let clinic = licensed();
    let session_id = invoiced_session(&clinic).await;
    let desk = &clinic.stores.invoicing;

    assert_eq!(desk.invoice_for_session(session_id).await, None);
    assert!(desk.invoice().snapshot().error.is_none());

    let preview = desk.preview_invoice(session_id).await.unwrap();
    assert_eq!(preview.patient_name, "Sara Haddad");
    assert_eq!(preview.invoice_number, "INV-001");
    assert_eq!(preview.procedures.len(), 2);
    assert_eq!(preview.total_amount, 3500);

    let invoice = desk.create_invoice(session_id).await.unwrap();
    assert_eq!(invoice.invoice_number, "INV-001");
    assert_eq!(invoice.status, "issued");
    assert_eq!(
        desk.invoice().snapshot().success.as_deref(),
        Some("Invoice created successfully")
    );
    assert_eq!(desk.preview().value(), None);

    assert_eq!(desk.create_invoice(session_id).await, None);
    let state = desk.invoice().snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("invoice already exists for this session")
    );
    assert_eq!(state.value, Some(invoice.clone()));

    assert_eq!(desk.invoice_for_session(session_id).await, Some(invoice));
}

#[tokio::test]
async fn test_payments_against_an_invoice() {
    let clinic = licensed();
    let session_id = invoiced_session(&clinic).await;
    let desk = &clinic.stores.invoicing;
    let invoice = desk.create_invoice(session_id).await.unwrap();

    assert_eq!(desk.load_payments(0).await, None);
    assert_eq!(desk.payments().snapshot().error.as_deref(), Some(MISSING_INVOICE_ID));
    assert!(clinic.backend.calls_to("GetInvoicePaymentDetails").is_empty());

    let details = desk.load_payments(invoice.id).await.unwrap();
    assert_eq!(details.remaining, 3500);
    assert!(details.allow_payments);

    let today = clinic.backend.today();
    let payment = NewPayment {
        invoice_id: invoice.id,
        amount: 1500,
        payment_date: today.clone(),
        note: "first visit".into(),
    };
    assert!(desk.add_payment(payment).await);
    let state = desk.payments().snapshot();
    assert_eq!(state.success.as_deref(), Some("Payment added successfully"));
    let details = state.value.unwrap();
    assert_eq!(details.status, "partially_paid");
    assert_eq!(details.total_paid, 1500);
    assert_eq!(details.remaining, 2000);
    assert_eq!(details.payments[0].payment_code, "Payment-001");
    assert_eq!(
        clinic.backend.calls_to("CreateInvoicePayment")[0],
        vec![json!(invoice.id), json!(1500), json!(today), json!("first visit"), json!(LICENSE)]
    );

    let overpaid = NewPayment {
        invoice_id: invoice.id,
        amount: 2500,
        payment_date: clinic.backend.today(),
        ..NewPayment::default()
    };
    assert!(!desk.add_payment(overpaid).await);
    let state = desk.payments().snapshot();
    assert_eq!(state.error.as_deref(), Some("payment exceeds remaining balance"));
    assert_eq!(state.value.map(|d| d.remaining), Some(2000));
}

#[tokio::test]
async fn test_invoice_overview_falls_back_to_zeroes() {
    let clinic = licensed();
    let today = clinic.backend.today();
    clinic
        .backend
        .seed(
            Table::Invoices,
            &json!({ "invoice_date": today, "total_amount": 4200, "status": "issued" }),
        )
        .unwrap();
    let desk = &clinic.stores.invoicing;

    let overview = desk.load_overview().await;
    assert_eq!(overview.today_total, 4200);
    assert_eq!(overview.today_count, 1);
    assert_eq!(overview.month_count, 1);

    clinic
        .backend
        .fail_next("GetInvoiceOverview", RpcFailure::text("database locked"));
    assert_eq!(desk.load_overview().await, InvoiceOverview::default());
    let state = desk.overview().snapshot();
    assert_eq!(state.value, Some(InvoiceOverview::default()));
    assert_eq!(state.error.as_deref(), Some("database locked"));

    clinic.stores.reset_all();
    assert_eq!(desk.overview().snapshot().error, None);
}

// --- CRUD through the real procedures ---

#[tokio::test]
async fn test_patient_lifecycle() {
    let clinic = licensed();
    let patients = &clinic.stores.patients;

    assert!(patients.create(patient("Sara Haddad")).await);
    assert!(patients.create(patient("Omar Nasser")).await);
    let state = patients.snapshot();
    assert_eq!(state.success.as_deref(), Some("Patient created successfully"));
    assert_eq!(state.items.len(), 2);

    let mut sara = state.items[0].clone();
    sara.phone = "0550 123 456".into();
    assert!(patients.update(sara.id, sara.clone()).await);
    assert_eq!(patients.snapshot().items[0].phone, "0550 123 456");
    assert_eq!(
        clinic.backend.calls_to("UpdatePatient")[0][0]["id"],
        json!(sara.id)
    );

    assert!(patients.delete(sara.id).await);
    let state = patients.snapshot();
    assert_eq!(state.success.as_deref(), Some("Patient deleted successfully"));
    assert_eq!(state.items.len(), 1);
    assert_eq!(clinic.backend.row_count(Table::Patients), 1);
}

#[tokio::test]
async fn test_deleting_missing_row_reports_backend_text() {
    let clinic = licensed();

    assert!(!clinic.stores.patients.delete(99).await);

    let state = clinic.stores.patients.snapshot();
    assert_eq!(state.error.as_deref(), Some("patient 99 not found"));
    assert!(state.success.is_none());
}

#[tokio::test]
async fn test_structured_validation_error() {
    let clinic = licensed();

    let created = clinic.stores.procedures.create(ProcedureForm::default()).await;

    assert!(!created);
    assert_eq!(
        clinic.stores.procedures.snapshot().error.as_deref(),
        Some("procedure name is required")
    );
    assert!(clinic.backend.calls_to("GetProceduresPaginated").is_empty());
}

#[tokio::test]
async fn test_failed_reload_withholds_success() {
    let clinic = licensed();
    clinic
        .backend
        .fail_next("GetPatients", RpcFailure::Structured(json!({})));

    let created = clinic.stores.patients.create(patient("Sara")).await;

    assert!(created);
    let state = clinic.stores.patients.snapshot();
    assert_eq!(state.error.as_deref(), Some("Unknown error"));
    assert!(state.success.is_none());
    assert_eq!(clinic.backend.row_count(Table::Patients), 1);
}

// --- Signed-in user stamping ---

#[tokio::test]
async fn test_stamped_create_requires_sign_in() {
    let clinic = licensed();
    let form = WorkTypeForm {
        name: "Veneer".into(),
        ..WorkTypeForm::default()
    };

    assert!(!clinic.stores.work_types.create(form.clone()).await);
    assert_eq!(
        clinic.stores.work_types.snapshot().error.as_deref(),
        Some("User not authenticated. Please log in.")
    );
    assert!(clinic.backend.calls_to("CreateWorkType").is_empty());

    clinic
        .license
        .sign_in(User::new(3, "dr.omar", "dentist"), "session")
        .unwrap();
    assert!(clinic.stores.work_types.create(form).await);

    assert_eq!(
        clinic.backend.calls_to("CreateWorkType")[0][1..],
        [json!(3), json!(LICENSE)]
    );
    let state = clinic.stores.work_types.snapshot();
    assert_eq!(state.items[0].created_by, Some(3));
    assert_eq!(state.success.as_deref(), Some("Work type created successfully"));
}

#[tokio::test]
async fn test_lab_order_joins_and_filters() {
    let clinic = signed_in();
    let patient_id = clinic
        .backend
        .seed(Table::Patients, &json!({ "name": "Sara Haddad" }))
        .unwrap();
    let lab_id = clinic
        .backend
        .seed(Table::DentalLabs, &json!({ "name": "Smile Lab" }))
        .unwrap();
    let work_type_id = clinic
        .backend
        .seed(Table::WorkTypes, &json!({ "name": "Crown" }))
        .unwrap();

    let form = LabOrderForm {
        patient_id,
        lab_id,
        work_type_id,
        quantity: 1,
        lab_cost: 12000,
        order_date: "2024-05-02".into(),
        ..LabOrderForm::default()
    };
    assert!(clinic.stores.lab_orders.create(form).await);

    let order = clinic.stores.lab_orders.snapshot().items[0].clone();
    assert_eq!(order.order_number, "LAB-0001");
    assert_eq!(order.patient_name, "Sara Haddad");
    assert_eq!(order.lab_name, "Smile Lab");
    assert_eq!(order.status, "pending");

    clinic
        .stores
        .lab_orders
        .apply_filters(LabOrderFilter {
            status: " delivered ".into(),
            ..LabOrderFilter::default()
        })
        .await;
    assert!(clinic.stores.lab_orders.snapshot().items.is_empty());
    let last = clinic.backend.calls_to("GetLabOrdersPaginated").pop().unwrap();
    assert_eq!(
        last,
        vec![
            json!(1),
            json!(20),
            json!(""),
            json!(""),
            json!(""),
            json!("delivered"),
            json!(LICENSE),
        ]
    );

    clinic
        .stores
        .lab_orders
        .remove_filter(LabOrderFilterKind::Status, None)
        .await;
    assert_eq!(clinic.stores.lab_orders.snapshot().items.len(), 1);
}

// --- Pagination and server-side filters ---

#[tokio::test]
async fn test_invoices_use_their_own_page_size() {
    let clinic = licensed();
    for n in 1..=7 {
        clinic
            .backend
            .seed(
                Table::Invoices,
                &json!({ "invoice_number": format!("INV-{n:03}"), "total_amount": n * 100 }),
            )
            .unwrap();
    }

    clinic.stores.invoices.load_page(2).await;

    let state = clinic.stores.invoices.snapshot();
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.items[0].invoice_number, "INV-006");
    assert_eq!(state.page.current, 2);
    assert_eq!(state.page.total_pages, 2);
    assert_eq!(state.page.total_count, 7);
    assert_eq!(
        clinic.backend.calls_to("GetInvoices"),
        vec![vec![json!(2), json!(5), json!(LICENSE)]]
    );
}

#[tokio::test]
async fn test_configured_page_size_reaches_backend() {
    let clinic = clinic_with(ClinicConfig {
        page_size: 3,
        ..ClinicConfig::default()
    });
    clinic.license.set_license(LICENSE, None).unwrap();
    for name in ["A1", "A2", "A3", "A4"] {
        clinic
            .backend
            .seed(Table::ColorShades, &json!({ "name": name }))
            .unwrap();
    }

    clinic.stores.color_shades.load_page(2).await;

    let state = clinic.stores.color_shades.snapshot();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.page.page_size, 3);
    assert!(state.page.has_previous());
    assert!(!state.page.has_next());
}

#[tokio::test]
async fn test_session_filters_restart_at_first_page() {
    let clinic = licensed();
    for n in 0..25 {
        let status = if n % 5 == 0 { "in-progress" } else { "completed" };
        clinic
            .backend
            .seed(
                Table::Sessions,
                &json!({
                    "patient_id": 1 + n % 2,
                    "dentist_id": 1,
                    "session_date": format!("2024-04-{:02}", n + 1),
                    "status": status,
                }),
            )
            .unwrap();
    }
    let sessions = &clinic.stores.sessions;

    sessions.load_page(3).await;
    assert_eq!(sessions.current_page(), 3);
    assert_eq!(sessions.snapshot().items.len(), 5);

    sessions
        .apply_filters(SessionFilter {
            status: Some("in-progress".into()),
            dentist_id: Some(0),
            ..SessionFilter::default()
        })
        .await;

    let state = sessions.snapshot();
    assert_eq!(state.page.current, 1);
    assert_eq!(state.items.len(), 5);
    assert!(state.items.iter().all(|s| s.status == "in-progress"));
    let last = clinic.backend.calls_to("GetSessions").pop().unwrap();
    assert_eq!(
        last,
        vec![
            json!(1),
            json!({
                "patient_id": null,
                "status": "in-progress",
                "dentist_id": null,
                "date_from": null,
                "date_to": null,
                "procedure_ids": [],
            }),
            json!(LICENSE),
        ]
    );

    sessions
        .apply_filters(SessionFilter {
            date_from: Some("2024-04-10".into()),
            date_to: Some("2024-04-20".into()),
            ..sessions.current_filter()
        })
        .await;
    assert_eq!(sessions.snapshot().items.len(), 2);

    sessions.remove_filter(SessionFilterKind::Date, None).await;
    assert_eq!(sessions.snapshot().items.len(), 5);

    sessions.clear_all_filters().await;
    assert_eq!(sessions.snapshot().page.total_count, 25);
    assert!(sessions.current_filter().is_empty());
}

#[tokio::test]
async fn test_session_update_replaces_items() {
    let clinic = licensed();
    let form = SessionForm {
        patient_id: 1,
        dentist_id: 1,
        session_date: "2024-06-01".into(),
        status: "in-progress".into(),
        items: vec![SessionItemForm {
            procedure_id: Some(1),
            item_name: "Filling".into(),
            amount: 3000,
        }],
        ..SessionForm::default()
    };
    assert!(clinic.stores.sessions.create(form).await);
    let mut session = clinic.stores.sessions.snapshot().items[0].clone();
    assert_eq!(session.total_amount, 3000);

    session.status = "completed".into();
    let items = vec![
        SessionItemForm {
            procedure_id: Some(1),
            item_name: "Filling".into(),
            amount: 3000,
        },
        SessionItemForm {
            procedure_id: None,
            item_name: "X-ray".into(),
            amount: 500,
        },
    ];
    assert!(clinic.stores.sessions.update(session.id, (session.clone(), items)).await);

    let call = clinic.backend.calls_to("UpdateSession").pop().unwrap();
    assert_eq!(call.len(), 3);
    assert_eq!(call[1].as_array().map(Vec::len), Some(2));

    let updated = clinic.stores.sessions.snapshot().items[0].clone();
    assert_eq!(updated.status, "completed");
    assert_eq!(updated.total_amount, 3500);
    assert_eq!(updated.items.len(), 2);
    assert_eq!(
        clinic.stores.sessions.snapshot().success.as_deref(),
        Some("Session updated successfully")
    );
}

#[tokio::test]
async fn test_load_all_fills_every_store() {
    let clinic = licensed();
    clinic
        .backend
        .seed(Table::Procedures, &json!({ "name": "Cleaning", "price": 1500 }))
        .unwrap();
    clinic
        .backend
        .seed(Table::Payments, &json!({ "payment_code": "PAY-1", "payment_amount": 500 }))
        .unwrap();

    clinic.stores.load_all().await;

    assert_eq!(clinic.stores.procedures.snapshot().items.len(), 1);
    assert_eq!(clinic.stores.payments.snapshot().items[0].payment_code, "PAY-1");
    assert!(clinic.stores.expense_categories.snapshot().error.is_none());
    let procedures: Vec<String> = clinic
        .backend
        .calls()
        .into_iter()
        .map(|(procedure, _)| procedure)
        .collect();
    assert_eq!(procedures.len(), 11);
    assert!(procedures.iter().any(|p| p == "GetDentalLabsPaginated"));
    assert!(procedures.iter().all(|p| p.starts_with("Get")));
}
