//! Canned menu replies.
//!
//! Maps one incoming chat message to the ordered texts the bot sends back.
//! Pure: no I/O, no state. Pacing is applied by the controller.

use atende_core::message::IncomingMessage;
use regex::Regex;
use std::sync::LazyLock;

/// Greeting keywords that open the main menu. Unanchored: a keyword anywhere
/// in the text counts.
static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(menu|dia|tarde|noite|oi|olá|ola)").expect("greeting pattern is valid")
});

const MENU_OPTIONS: &str = "1 - Como funciona\n\
                            2 - Planos\n\
                            3 - Benefícios\n\
                            4 - Como aderir\n\
                            5 - Outras dúvidas";

const HOW_IT_WORKS: &[&str] = &[
    "Nosso serviço oferece consultas médicas 24 horas por dia, 7 dias por semana, \
     diretamente pelo WhatsApp. Sem carência e com benefícios ilimitados.",
    "COMO FUNCIONA?\n1. Faça seu cadastro.\n2. Efetue o pagamento.\n3. Comece a usar imediatamente!",
    "Link para cadastro: https://site.com",
];

const PLANS: &[&str] = &["Planos disponíveis:\n\n\
     Individual: R$22,50/mês\n\
     Família: R$39,90/mês (até 4 membros)\n\n\
     Para mais detalhes, acesse: https://site.com"];

const BENEFITS: &[&str] = &[
    "BENEFÍCIOS:\n\
     - Consultas médicas ilimitadas, 24 horas por dia\n\
     - Sem carência: use a partir do primeiro dia\n\
     - Atendimento direto pelo WhatsApp\n\
     - Receitas e atestados digitais",
    "Tudo isso a partir de R$22,50/mês. Responda 2 para ver os planos.",
];

const HOW_TO_JOIN: &[&str] = &[
    "Para aderir é simples:\n\
     1. Acesse https://site.com\n\
     2. Escolha o plano Individual ou Família.\n\
     3. Preencha seus dados e finalize o pagamento.",
    "Pronto! O acesso é liberado assim que o pagamento for confirmado.",
];

const OTHER_QUESTIONS: &[&str] = &[
    "Ficou com alguma dúvida? Escreva sua pergunta aqui e um de nossos atendentes \
     responderá em breve.",
    "Atendimento humano: segunda a sexta, das 8h às 18h.",
];

/// Texts to send back, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub texts: Vec<String>,
    /// Send with typing presence and delays between messages.
    pub paced: bool,
}

impl Reply {
    fn immediate(text: String) -> Self {
        Self {
            texts: vec![text],
            paced: false,
        }
    }

    fn paced(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
            paced: true,
        }
    }
}

/// Main menu greeting, addressed by first name when known.
pub fn menu_greeting(first_name: Option<&str>) -> String {
    let hello = match first_name {
        Some(name) => format!("Olá, {name}!"),
        None => "Olá!".to_string(),
    };
    format!("{hello} Sou o assistente virtual da empresa. Como posso ajudar?\n{MENU_OPTIONS}")
}

fn invalid_option() -> String {
    format!("Desculpe, não entendi. Por favor, escolha uma opção válida:\n{MENU_OPTIONS}")
}

/// Decide the reply for an incoming message. `None` means stay silent.
pub fn respond(msg: &IncomingMessage) -> Option<Reply> {
    if !msg.is_individual() {
        return None;
    }
    let text = msg.text.trim();
    if text.is_empty() {
        return None;
    }

    if GREETING.is_match(text) {
        return Some(Reply::immediate(menu_greeting(msg.first_name())));
    }

    let reply = match text {
        "1" => Reply::paced(HOW_IT_WORKS),
        "2" => Reply::paced(PLANS),
        "3" => Reply::paced(BENEFITS),
        "4" => Reply::paced(HOW_TO_JOIN),
        "5" => Reply::paced(OTHER_QUESTIONS),
        _ => Reply::immediate(invalid_option()),
    };
    Some(reply)
}
