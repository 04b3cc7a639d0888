use crate::bindings;
use crate::config::ClinicConfig;
use crate::invoicing::InvoiceDesk;
use crate::license::LicenseManager;
use crate::model::*;
use serde_json::Value;
use std::sync::Arc;
use store_framework::{
    CredentialResolver, LicensedCaller, RecordStore, ResourceStore, RpcGateway, RpcResource,
    RpcTransport, StorageError,
};
use tracing::{info, instrument, warn};

/// Declares the clinic's resources.
///
/// For each entry this generates `<Name>Api` and `<Name>Store` type aliases, a field on
/// [`ClinicStores`] and its construction from the shared gateway, identity and credentials.
macro_rules! clinic_resources {
    ($(
        $field:ident: $name:ident => $binding:path {
            item: $item:ty,
            create: $create:ty,
            update: $update:ty,
            filter: $filter:ty,
            page_size: $page_size:ident $(,)?
        }
    )*) => {
        paste::paste! {
            $(
                pub type [<$name Api>] = RpcResource<$item, $create, $update, $filter>;
                pub type [<$name Store>] = ResourceStore<[<$name Api>]>;
            )*

            /// Every clinic store, wired to one backend and one license manager.
            ///
            /// Stores are shared through `Arc` so presentation code can hold onto the ones it
            /// renders.
            pub struct ClinicStores {
                $( pub $field: Arc<[<$name Store>]>, )*
                pub invoicing: Arc<InvoiceDesk>,
                /// The lab order opened on the detail screen.
                pub lab_order_detail: Arc<RecordStore<LabOrderDetail>>,
                caller: LicensedCaller,
                license: Arc<LicenseManager>,
            }

            impl ClinicStores {
                pub fn new(
                    transport: Arc<dyn RpcTransport>,
                    license: Arc<LicenseManager>,
                    config: &ClinicConfig,
                ) -> Self {
                    let gateway = RpcGateway::new(transport);
                    let credentials = Arc::new(license.resolver());
                    let caller = LicensedCaller::new(gateway.clone(), credentials.clone());
                    Self {
                        $(
                            $field: Arc::new(Self::[<build_ $field>](
                                &gateway,
                                &license,
                                credentials.clone(),
                                config,
                            )),
                        )*
                        invoicing: Arc::new(InvoiceDesk::new(caller.clone())),
                        lab_order_detail: Arc::new(RecordStore::new("lab order", caller.clone())),
                        caller,
                        license,
                    }
                }

                $(
                    fn [<build_ $field>](
                        gateway: &RpcGateway,
                        license: &Arc<LicenseManager>,
                        credentials: Arc<CredentialResolver>,
                        config: &ClinicConfig,
                    ) -> [<$name Store>] {
                        let api = [<$name Api>]::new(gateway.clone(), $binding)
                            .with_identity(license.clone());
                        ResourceStore::new(api, credentials).with_page_size(config.$page_size)
                    }
                )*

                /// Returns every store to its empty state.
                pub fn reset_all(&self) {
                    $( self.$field.reset(); )*
                    self.invoicing.reset();
                    self.lab_order_detail.reset();
                }
            }
        }
    };
}

clinic_resources! {
    patients: Patient => bindings::PATIENTS {
        item: Patient,
        create: PatientForm,
        update: Patient,
        filter: (),
        page_size: page_size,
    }
    appointments: Appointment => bindings::APPOINTMENTS {
        item: Appointment,
        create: Appointment,
        update: Appointment,
        filter: (),
        page_size: page_size,
    }
    sessions: Session => bindings::SESSIONS {
        item: Session,
        create: SessionForm,
        update: SessionUpdate,
        filter: SessionFilter,
        page_size: page_size,
    }
    invoices: Invoice => bindings::INVOICES {
        item: InvoiceListItem,
        create: (),
        update: (),
        filter: (),
        page_size: invoice_page_size,
    }
    payments: Payment => bindings::PAYMENTS {
        item: PaymentListItem,
        create: (),
        update: (),
        filter: (),
        page_size: payment_page_size,
    }
    lab_orders: LabOrder => bindings::LAB_ORDERS {
        item: LabOrder,
        create: LabOrderForm,
        update: LabOrderForm,
        filter: LabOrderFilter,
        page_size: lab_order_page_size,
    }
    procedures: Procedure => bindings::PROCEDURES {
        item: Procedure,
        create: ProcedureForm,
        update: Procedure,
        filter: (),
        page_size: page_size,
    }
    work_types: WorkType => bindings::WORK_TYPES {
        item: WorkType,
        create: WorkTypeForm,
        update: WorkTypeForm,
        filter: (),
        page_size: page_size,
    }
    color_shades: ColorShade => bindings::COLOR_SHADES {
        item: ColorShade,
        create: ColorShadeForm,
        update: ColorShadeForm,
        filter: (),
        page_size: page_size,
    }
    dental_labs: DentalLab => bindings::DENTAL_LABS {
        item: DentalLab,
        create: DentalLabForm,
        update: DentalLabForm,
        filter: (),
        page_size: page_size,
    }
    expense_categories: ExpenseCategory => bindings::EXPENSE_CATEGORIES {
        item: ExpenseCategory,
        create: ExpenseCategoryForm,
        update: ExpenseCategoryForm,
        filter: (),
        page_size: page_size,
    }
}

impl ClinicStores {
    pub fn license(&self) -> &Arc<LicenseManager> {
        &self.license
    }

    /// Forgets the license and empties every store, as after a failed validation or logout.
    ///
    /// The stores are emptied even when the stored key could not be removed.
    pub fn clear_license(&self) -> Result<(), StorageError> {
        let cleared = self.license.clear_license();
        self.reset_all();
        info!(cleared = cleared.is_ok(), "All stores reset");
        cleared
    }

    /// Validates the current key with the backend. A key the backend declares invalid is
    /// cleared together with every store; a failed call leaves everything in place.
    #[instrument(skip(self))]
    pub async fn validate_license(&self) -> bool {
        match self.license.validate(self.caller.gateway()).await {
            Ok(true) => true,
            Ok(false) => {
                if self.license.account().license_key.is_empty() {
                    return false;
                }
                if let Err(e) = self.clear_license() {
                    warn!(error = %e, "Could not remove the rejected license");
                }
                false
            }
            Err(_) => false,
        }
    }

    /// Installs `key` and validates it. Returns whether the backend accepted it.
    pub async fn install_license(
        &self,
        key: &str,
        expiry: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.license.set_license(key, expiry)?;
        Ok(self.validate_license().await)
    }

    /// Opens one lab order with all its details.
    pub async fn load_lab_order(&self, id: i64) -> Option<LabOrderDetail> {
        self.lab_order_detail
            .fetch(bindings::GET_LAB_ORDER, vec![Value::from(id)])
            .await
    }

    /// Loads the first page of every store. Outcomes land on each store's state.
    pub async fn load_all(&self) {
        tokio::join!(
            self.patients.load_page(1),
            self.appointments.load_page(1),
            self.sessions.load_page(1),
            self.invoices.load_page(1),
            self.payments.load_page(1),
            self.lab_orders.load_page(1),
            self.procedures.load_page(1),
            self.work_types.load_page(1),
            self.color_shades.load_page(1),
            self.dental_labs.load_page(1),
            self.expense_categories.load_page(1),
        );
    }
}
