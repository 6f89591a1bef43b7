use serde::{Deserialize, Serialize};

// --- Fleet registries ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Driver {
  pub id: String,
  pub name: String,
  pub cnh: String,
  pub phone: String,
  pub status: String,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DriverInput {
  pub name: String,
  pub cnh: String,
  pub phone: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DriverUpdateInput {
  pub name: String,
  pub cnh: String,
  pub phone: String,
  pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Vehicle {
  pub id: String,
  pub plate: String,
  pub model: String,
  pub chassi: String,
  pub status: String,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VehicleInput {
  pub plate: String,
  pub model: String,
  pub chassi: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Admin {
  pub id: String,
  pub name: String,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminInput {
  pub name: String,
  pub password: String,
}

// --- Trips and their child collections ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Cargo {
  pub id: String,
  pub cargo_type: String,
  pub weight: f64,
  pub price_per_ton: f64,
  pub tax: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CargoInput {
  pub cargo_type: String,
  pub weight: f64,
  pub price_per_ton: f64,
  pub tax: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Fueling {
  pub id: String,
  pub station: String,
  pub date: String,
  pub km: f64,
  pub liters: f64,
  pub total_amount: f64,
  pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FuelingInput {
  pub station: String,
  pub date: String,
  pub km: f64,
  pub liters: f64,
  pub total_amount: f64,
  pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TripExpense {
  pub id: String,
  pub category: String,
  pub description: String,
  pub amount: f64,
  pub date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TripExpenseInput {
  pub category: String,
  pub description: String,
  pub amount: f64,
  pub date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReceivedPayment {
  pub id: String,
  pub pay_type: String,
  pub method: String,
  pub amount: f64,
  pub date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReceivedPaymentInput {
  pub pay_type: String,
  pub method: String,
  pub amount: f64,
  pub date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Trip {
  pub id: String,
  pub driver_id: String,
  pub vehicle_id: String,
  pub origin: String,
  pub destination: String,
  pub start_date: String,
  pub end_date: Option<String>,
  pub start_km: f64,
  pub end_km: f64,
  pub status: String,
  pub commission_rate: f64,
  pub monthly_trip_number: Option<i64>,
  pub signed_at: Option<String>,
  pub signature_confirmed: bool,
  pub cargo: Vec<Cargo>,
  pub fueling: Vec<Fueling>,
  pub expenses: Vec<TripExpense>,
  pub received_payments: Vec<ReceivedPayment>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TripInput {
  pub driver_id: String,
  pub vehicle_id: String,
  pub origin: String,
  pub destination: String,
  pub start_date: String,
  pub start_km: f64,
  pub commission_rate: f64,
  pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FinishTripInput {
  pub end_date: String,
  pub end_km: f64,
}

// --- Installment-bearing expenses ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpensePayment {
  pub id: String,
  pub date: String,
  pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExpensePaymentInput {
  pub date: String,
  pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FixedExpense {
  pub id: String,
  pub vehicle_id: String,
  pub description: String,
  pub category: String,
  pub total_amount: f64,
  pub installments: i64,
  pub first_payment_date: String,
  pub payments: Vec<ExpensePayment>,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FixedExpenseInput {
  pub vehicle_id: String,
  pub description: String,
  pub category: String,
  pub total_amount: f64,
  pub installments: i64,
  pub first_payment_date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkshopExpense {
  pub id: String,
  pub vehicle_id: String,
  pub description: String,
  pub service_date: String,
  pub first_payment_date: String,
  pub total_amount: f64,
  pub installments: i64,
  pub payments: Vec<ExpensePayment>,
  pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkshopExpenseInput {
  pub vehicle_id: String,
  pub description: String,
  pub service_date: String,
  pub first_payment_date: String,
  pub total_amount: f64,
  pub installments: i64,
}

// --- Finance tables (original column names preserved) ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContaPagar {
  pub id: i64,
  pub descricao: String,
  pub valor_com_nota: f64,
  pub valor_sem_nota: f64,
  pub categoria: String,
  pub vencimento: String,
  pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContaPagarInput {
  pub descricao: String,
  pub valor_com_nota: f64,
  pub valor_sem_nota: f64,
  pub categoria: String,
  pub vencimento: String,
  pub status: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FluxoCaixa {
  pub id: i64,
  pub data_movimento: String,
  pub descricao: String,
  pub categoria: String,
  pub tipo_movimento: String,
  pub valor: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FluxoCaixaInput {
  pub data_movimento: String,
  pub descricao: String,
  pub categoria: String,
  pub tipo_movimento: String,
  pub valor: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaturamentoComNf {
  pub id: i64,
  pub data_faturamento: String,
  pub cliente: String,
  pub nota_servico: Option<String>,
  pub nota_peca: Option<String>,
  pub valor_total: f64,
  pub parcelas: i64,
  pub condicoes_pagamento: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaturamentoComNfInput {
  pub data_faturamento: String,
  pub cliente: String,
  pub nota_servico: Option<String>,
  pub nota_peca: Option<String>,
  pub valor_total: f64,
  pub parcelas: i64,
  pub condicoes_pagamento: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaturamentoSemNf {
  pub id: i64,
  pub data_faturamento: String,
  pub numero_orcamento: Option<String>,
  pub valor_total: f64,
  pub condicao_pagamento: Option<String>,
  pub categoria: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FaturamentoSemNfInput {
  pub data_faturamento: String,
  pub numero_orcamento: Option<String>,
  pub valor_total: f64,
  pub condicao_pagamento: Option<String>,
  pub categoria: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Usuario {
  pub id: i64,
  pub nome: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UsuarioInput {
  pub nome: String,
  pub password: String,
}

// --- Query and paging ---

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ListQuery {
  pub page: i64,
  pub search: Option<String>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

// --- Reports ---

#[derive(Debug, Serialize, Deserialize)]
pub struct FinanceDashboard {
  pub faturamento_com_nf: f64,
  pub faturamento_sem_nf_liquido: f64,
  pub faturamento_total: f64,
  pub balanco_caixa: f64,
  pub contas_pagar_total: f64,
  pub contas_vencidas_total: f64,
  pub contas_pendentes_total: f64,
  pub lucro_previsto: f64,
  pub top_despesas: Vec<CategoryTotal>,
  pub evolucao_labels: Vec<String>,
  pub evolucao_com_nf: Vec<f64>,
  pub evolucao_sem_nf: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryTotal {
  pub categoria: String,
  pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FleetOverview {
  pub drivers: i64,
  pub vehicles: i64,
  pub trips_in_progress: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DriverOverview {
  pub driver_id: String,
  pub completed_trips: i64,
  pub total_km: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VehicleBillingRow {
  pub vehicle_id: String,
  pub plate: String,
  pub gross_revenue: f64,
  pub net_revenue: f64,
  pub fixed_expenses: f64,
  pub workshop_expenses: f64,
  pub total_km: f64,
  pub total_liters: f64,
  pub final_profit: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillingReport {
  pub month: String,
  pub gross_revenue: f64,
  pub net_revenue: f64,
  pub fixed_expenses: f64,
  pub workshop_expenses: f64,
  pub final_profit: f64,
  pub vehicles: Vec<VehicleBillingRow>,
}

// --- Sessions ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionUser {
  pub user_id: String,
  pub name: String,
  pub role: String,
  pub driver_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
  pub token: String,
  pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
  pub user_id: String,
  pub user_type: String,
  pub new_password: String,
  pub old_password: Option<String>,
}

// --- Settings / audit ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
  pub company_name: String,
  pub current_year: i32,
  pub page_size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
  pub id: i64,
  pub ts: String,
  pub actor: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub payload_json: String,
  pub details: Option<String>,
}
