//! Built-in collection definitions

use super::CollectionSpec;
use crate::ingest::ValidationRule;

const DATE: &str = r"^\d{4}-\d{2}-\d{2}$";
const YEAR_MONTH: &str = r"^\d{4}-(0[1-9]|1[0-2])$";
const BUSINESS_NUMBER: &str = r"^\d{3}-?\d{2}-?\d{5}$";
const CURRENCY: &str = r"^[A-Z]{3}$";

pub(super) fn builtin_collections() -> Vec<CollectionSpec> {
    vec![
        vendors(),
        brands(),
        projects(),
        payout_accounts(),
        online_commerce_income(),
        global_marketing_income(),
        global_sales_income(),
        brand_planning_income(),
        other_income(),
    ]
}

fn vendors() -> CollectionSpec {
    CollectionSpec::new("vendors", "vendors")
        .key("vendor_code")
        .map("businessNumber", "business_registration_number")
        .required(["vendor_code", "vendor_name"])
        .rule(ValidationRule::pattern(
            "business_registration_number",
            BUSINESS_NUMBER,
        ))
        .unique(["vendor_code"])
}

fn brands() -> CollectionSpec {
    CollectionSpec::new("brands", "brands")
        .key("brand_code")
        .required(["brand_code", "brand_name"])
        .unique(["brand_code"])
}

fn projects() -> CollectionSpec {
    CollectionSpec::new("projects", "projects")
        .key("project_code")
        .required(["project_code", "project_name"])
        .numbers(["budget"])
        .rule(ValidationRule::pattern("start_date", DATE))
        .rule(ValidationRule::pattern("end_date", DATE))
        .unique(["project_code"])
}

fn payout_accounts() -> CollectionSpec {
    CollectionSpec::new("payout_accounts", "influencer_payout_accounts")
        .key("influencer_name")
        .map("accountHolder", "account_holder_name")
        .map("accountNo", "account_number")
        .required(["influencer_name", "bank_name", "account_number"])
        .rule(ValidationRule::non_empty_string("account_number"))
        .unique(["account_number"])
}

/// Common shape of every income table
fn income(name: &str, key: &str, currency: &str) -> CollectionSpec {
    CollectionSpec::new(name, name)
        .key(key)
        .default_value("currency", currency)
        .numbers(["amount"])
        .rule(ValidationRule::pattern("currency", CURRENCY))
        .unique([key])
}

fn online_commerce_income() -> CollectionSpec {
    income("online_commerce_income", "order_number", "KRW")
        .required(["order_number", "brand_code", "sales_date", "amount"])
        .numbers(["quantity", "commission"])
        .rule(ValidationRule::pattern("sales_date", DATE))
}

fn global_marketing_income() -> CollectionSpec {
    income("global_marketing_income", "invoice_number", "USD")
        .required(["invoice_number", "project_code", "amount"])
        .numbers(["exchange_rate"])
        .rule(ValidationRule::pattern("invoice_date", DATE))
}

fn global_sales_income() -> CollectionSpec {
    income("global_sales_income", "invoice_number", "USD")
        .required(["invoice_number", "country", "amount"])
        .numbers(["quantity", "exchange_rate"])
        .rule(ValidationRule::pattern("invoice_date", DATE))
}

fn brand_planning_income() -> CollectionSpec {
    income("brand_planning_income", "plan_code", "KRW")
        .required(["plan_code", "brand_code", "year_month", "amount"])
        .rule(ValidationRule::pattern("year_month", YEAR_MONTH))
}

fn other_income() -> CollectionSpec {
    income("other_income", "reference_code", "KRW")
        .required(["reference_code", "description", "amount"])
        .rule(ValidationRule::pattern("received_date", DATE))
}
