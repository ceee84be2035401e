//! User-facing texts (pt-BR) shown by the dashboard.

use crate::models::EntryKind;

pub const TITLE_REQUIRED: &str = "Título é obrigatório";
pub const BLOCK_NAME_REQUIRED: &str = "Nome é obrigatório";
pub const CUSTOMER_REQUIRED: &str = "Cliente é obrigatório";
pub const PROFESSIONAL_REQUIRED: &str = "Profissional é obrigatório";
pub const SERVICES_REQUIRED: &str = "Selecione pelo menos um serviço";
pub const START_DATE_REQUIRED: &str = "Data de início é obrigatória";
pub const START_TIME_REQUIRED: &str = "Hora de início é obrigatória";
pub const END_DATE_REQUIRED: &str = "Data de término é obrigatória";
pub const END_TIME_REQUIRED: &str = "Hora de término é obrigatória";
pub const END_BEFORE_START: &str = "O término deve ser posterior ao início";
pub const STATUS_INVALID: &str = "Status inválido para este tipo de registro";
pub const CANCELLED_READ_ONLY: &str = "Registros cancelados não podem ser editados";

pub const APPOINTMENT_CONFLICT: &str =
    "Não é possível agendar neste horário. Por favor, selecione outro.";
pub const BLOCK_CONFLICT: &str = "Não é possível bloquear neste horário. Por favor, selecione outro.";

pub const APPOINTMENT_SAVED: &str = "Agendamento salvo com sucesso!";
pub const BLOCK_SAVED: &str = "Bloqueio salvo com sucesso!";
pub const APPOINTMENT_MOVED: &str = "Horário atualizado com sucesso!";
pub const APPOINTMENT_COMPLETED: &str = "Atendimento concluído com sucesso!";
pub const APPOINTMENT_CANCELLED: &str = "Agendamento cancelado com sucesso!";
pub const APPOINTMENT_DELETED: &str = "Agendamento excluído permanentemente!";
pub const PAYMENT_REGISTERED: &str = "Pagamento registrado com sucesso!";

pub const SAVE_FAILED: &str =
    "Erro ao salvar. Verifique se o profissional possui agenda no horário selecionado.";
pub const LOAD_FAILED: &str = "Erro ao carregar dados. Tente novamente.";
pub const NOT_FOUND: &str = "Registro não encontrado";
pub const VALIDATION_FAILED: &str = "Verifique os campos do formulário";
pub const IN_FLIGHT: &str = "Uma operação já está em andamento para este registro";
pub const INVALID_TRANSITION: &str = "Esta alteração de status não é permitida";
pub const CONFIRM_PERMANENT_DELETE: &str =
    "Este agendamento já está cancelado. Confirme para excluí-lo permanentemente.";
pub const UPSTREAM_REJECTED: &str = "Não foi possível concluir a operação. Verifique os dados informados.";
pub const RECORD_IN_USE: &str =
    "Não é possível excluir este registro pois existem agendamentos vinculados a ele.";
pub const RECORD_DUPLICATE: &str = "Já existe um registro com estes dados.";

pub const PAYMENT_METHOD_REQUIRED: &str = "Selecione a forma de pagamento";
pub const PAYMENT_VALUE_REQUIRED: &str = "O valor deve ser maior que zero";
pub const INSTALLMENTS_OUT_OF_RANGE: &str = "Número de parcelas inválido para esta forma de pagamento";
pub const PAYMENT_UNAVAILABLE: &str =
    "Pagamento disponível apenas para atendimentos concluídos com cobrança pendente";
pub const PAYMENT_METHOD_NAME_REQUIRED: &str = "Nome é obrigatório";

pub const FINANCE_EXPECTED: &str = "Previsto";
pub const FINANCE_PENDING: &str = "Pendente";
pub const FINANCE_PAID: &str = "Pago";
pub const FINANCE_UNDEFINED: &str = "Não definido";
pub const FINANCE_NOT_APPLICABLE: &str = "Não aplicável";

pub const NO_CUSTOMER: &str = "Cliente não definido";
pub const NO_SERVICE: &str = "Serviço não definido";

pub const SCHEDULE_REPEAT_UNTIL_REQUIRED: &str =
    "O campo \"Repetir até\" é obrigatório quando há recorrência";
pub const SCHEDULE_REPEAT_UNTIL_BEFORE_START: &str =
    "\"Repetir até\" deve ser igual ou posterior à data de início";
pub const SCHEDULE_HAS_APPOINTMENTS: &str =
    "Não é possível excluir esta agenda pois existem agendamentos vinculados a ela.";

pub const ACCOUNT_AMOUNT_REQUIRED: &str = "O valor é obrigatório.";
pub const ACCOUNT_DUE_DATE_REQUIRED: &str = "A data de vencimento é obrigatória.";

pub fn conflict(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Appointment => APPOINTMENT_CONFLICT,
        EntryKind::Block => BLOCK_CONFLICT,
    }
}

pub fn saved(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Appointment => APPOINTMENT_SAVED,
        EntryKind::Block => BLOCK_SAVED,
    }
}

pub const RECORD_SAVED: &str = "Registro salvo com sucesso!";
pub const RECORD_DELETED: &str = "Registro excluído com sucesso!";
