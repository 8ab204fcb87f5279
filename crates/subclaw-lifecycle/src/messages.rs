//! Message catalog. Everything the bot says lives here.

use chrono::NaiveDate;
use subclaw_core::types::ClientRecord;

use crate::records::format_display_date;

/// Escalation level of an operator alert about a lapsing client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    FirstNotice,
    SecondNotice,
    FinalNotice,
    Suspended,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::FirstNotice,
        Severity::SecondNotice,
        Severity::FinalNotice,
        Severity::Suspended,
    ];

    /// Operator-facing level number, 1 through 4.
    pub fn level(self) -> u8 {
        match self {
            Severity::FirstNotice => 1,
            Severity::SecondNotice => 2,
            Severity::FinalNotice => 3,
            Severity::Suspended => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.level() == level)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::FirstNotice => write!(f, "first-notice"),
            Severity::SecondNotice => write!(f, "second-notice"),
            Severity::FinalNotice => write!(f, "final-notice"),
            Severity::Suspended => write!(f, "suspended"),
        }
    }
}

fn or_missing(value: &str) -> &str {
    if value.is_empty() { "No registrado" } else { value }
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(format_display_date)
        .unwrap_or_else(|| "Sin fecha".to_string())
}

/// Operator alert for a client at the given escalation level.
pub fn operator_alert(c: &ClientRecord, severity: Severity) -> String {
    match severity {
        Severity::FirstNotice => format!(
            "🚨 ¡ALERTA! El cliente *{}* no ha renovado a tiempo. Primer recordatorio enviado. Correo: *{}*",
            c.name, c.email
        ),
        Severity::SecondNotice => format!(
            "⚠️ SEGUNDO AVISO. El cliente *{}* aún no ha pagado. Correo: *{}*. Por favor, contáctalo.",
            c.name, c.email
        ),
        Severity::FinalNotice => format!(
            "❌ AVISO FINAL. El servicio de *{}* está a punto de ser suspendido. Correo: *{}*. Es urgente contactarlo.",
            c.name, c.email
        ),
        Severity::Suspended => format!(
            "⛔️ SERVICIO SUSPENDIDO. El servicio de *{}* fue cortado por falta de pago. Correo: *{}*",
            c.name, c.email
        ),
    }
}

/// Client reminder on the expiration day.
pub fn due_today_reminder(c: &ClientRecord) -> String {
    format!(
        "Hola {name} 👋\n\
         Tu servicio de {service} con ID *{id}* vence hoy.\n\
         Para mantener tu acceso, por favor realiza tu pago.\n\
         📧 Correo: *{email}*\n\
         📅 Vencimiento: *{date}*\n\
         👤 Perfil: *{profile}*\n\n\
         ⏰ Tienes plazo hasta las 6:00 p.m. de hoy para completar tu pago y mantener activo el servicio.\n\n\
         🔄 ¿Cómo renovar?\n\
         1️⃣ Contacta a tu proveedor.\n\
         2️⃣ Envíale tu comprobante de pago.\n\
         ⭕ Si no deseas renovar, no necesitas hacer nada.\n\
         🙏 ¡Gracias por tu confianza!",
        name = c.name,
        service = c.service,
        id = c.id,
        email = or_missing(&c.email),
        date = display_date(c.expiration_date),
        profile = or_missing(&c.profile),
    )
}

/// Client reminder three days ahead.
pub fn early_warning(c: &ClientRecord) -> String {
    format!(
        "Hola {}, tu servicio de {} vence en 3 días ({}). Por favor, renueva a tiempo para no perder el acceso.",
        c.name,
        c.service,
        display_date(c.expiration_date)
    )
}

/// Operator heads-up three days ahead.
pub fn early_warning_alert(c: &ClientRecord) -> String {
    format!(
        "🔔 Aviso: el servicio de *{}* ({}) vence en 3 días.",
        c.name, c.id
    )
}

/// Account details sent to the client (manual delivery and `datos`).
pub fn account_delivery(c: &ClientRecord) -> String {
    format!(
        "¡Hola {}! Aquí están los detalles de tu cuenta:\n\
         💻 Servicio: *{}*\n\
         📧 Correo: *{}*\n\
         🔒 Contraseña: *{}*\n\
         👤 Perfil: *{}*\n\
         📌 PIN: *{}*\n\n\
         Tu servicio vence el *{}*.",
        c.name,
        c.service,
        c.email,
        c.password,
        c.profile,
        c.pin.as_deref().unwrap_or("No disponible"),
        display_date(c.expiration_date)
    )
}

/// One search hit, as listed to the operator.
pub fn client_details(c: &ClientRecord) -> String {
    format!(
        "---\n\
         *ID*: {}\n\
         *Nombre*: {}\n\
         *Teléfono*: {}\n\
         *Servicio*: {}\n\
         *Correo*: {}\n\
         *Perfil*: {}\n\
         *Vencimiento*: {}\n",
        c.id,
        c.name,
        c.phone,
        c.service,
        c.email,
        c.profile,
        display_date(c.expiration_date)
    )
}

pub fn search_results(hits: &[&ClientRecord]) -> String {
    let mut out = String::from("✅ Clientes encontrados:\n\n");
    for c in hits {
        out.push_str(&client_details(c));
    }
    out
}

pub fn search_miss(query: &str) -> String {
    format!("❌ No se encontró ningún cliente que coincida con la búsqueda: *{query}*.")
}

pub fn renewal_notice(c: &ClientRecord, days: u32, new_date: NaiveDate) -> String {
    format!(
        "✅ ¡Hola {}! Tu servicio de {} ha sido renovado por *{}* días. Tu nueva fecha de vencimiento es el *{}*. ¡Gracias por tu pago!",
        c.name,
        c.service,
        days,
        format_display_date(new_date)
    )
}

pub fn renewal_started(id: &str, days: u32) -> String {
    format!("🔄 Renovando cliente *{id}* por *{days}* días...")
}

pub fn renewal_done(id: &str, new_date: NaiveDate) -> String {
    format!(
        "✅ Cliente *{id}* renovado con éxito. Nueva fecha: {}.",
        format_display_date(new_date)
    )
}

pub fn renewal_failed(id: &str) -> String {
    format!("❌ No se pudo renovar al cliente *{id}*. Revisa la hoja e inténtalo de nuevo.")
}

pub fn client_not_found(id: &str) -> String {
    format!("❌ No se encontró ningún cliente con el ID *{id}*.")
}

pub fn delivery_done(c: &ClientRecord) -> String {
    format!("✅ Cuenta de *{}* ({}) entregada con éxito.", c.name, c.id)
}

pub fn delivery_failed(id: &str) -> String {
    format!("❌ Error al enviar la cuenta del cliente *{id}*.")
}

pub fn broadcast_banner(message: &str) -> String {
    format!("📢 *¡AVISO⚠️!* 🎉\n\n{message}")
}

pub fn broadcast_tally(sent: usize, failed: usize) -> String {
    format!("✅ Promoción enviada a {sent} cliente(s).\n❌ Falló el envío a {failed} cliente(s).")
}

pub fn sweep_summary(due_today: usize, early_warning: usize, failed: usize) -> String {
    format!(
        "✅ Recordatorios enviados. Vencen hoy: {due_today}. Vencen en 3 días: {early_warning}. Fallidos: {failed}."
    )
}

pub fn sync_done(count: usize) -> String {
    format!("✅ Caché sincronizado manualmente ({count} clientes).")
}

pub fn multiple_accounts(count: usize) -> String {
    format!("¡Hola! Encontramos *{count} cuentas* asociadas a tu número. Te las enviaré una por una:")
}

pub const BUSY_NOTICE: &str =
    "Estoy procesando una tarea en este momento. Por favor, espera unos segundos e inténtalo de nuevo.";

pub const UNKNOWN_COMMAND: &str =
    "🤔 Comando no reconocido. Por favor, usa *menu* para ver las opciones.";

pub const HEARTBEAT: &str = "🕒 El bot sigue activo y en funcionamiento.";

pub const STORE_READ_ALERT: &str =
    "🚨 ¡ERROR CRÍTICO! No pude cargar los clientes desde la hoja de cálculo. Revisa los registros del servidor.";

pub const SYNC_FAILED: &str = "❌ No se pudo sincronizar el caché. Se mantienen los datos anteriores.";

pub const BROADCAST_STARTED: &str = "🚀 Iniciando el envío de la promoción...";

pub const SWEEP_STARTED: &str = "🔄 Revisando vencimientos y enviando recordatorios...";

pub const NO_ACCOUNTS: &str = "❌ Lo siento, no pude encontrar ninguna cuenta asociada a tu número. Por favor, contacta a tu proveedor para más ayuda.";

pub const USER_HELP: &str = "Hola! Soy un bot de recordatorios de pago. Si necesitas recuperar los datos de tu cuenta, envía la palabra *datos*. Para más información, contacta a tu proveedor.";

pub const USER_GREETING: &str = "😊 ¡Hola! Un gusto saludarte. ¿En qué podemos ayudarte hoy? Sé paciente, en unos minutos te atenderemos. Si tienes algún problema, cuéntanos a detalle. ¡Gracias!";

pub const USAGE_DELIVER: &str = "❌ Comando incorrecto. Usa: *1 [ID del cliente]*";
pub const USAGE_SEARCH: &str = "❌ Comando incorrecto. Usa: *2 [nombre/teléfono]*";
pub const USAGE_BROADCAST: &str = "❌ Comando incorrecto. Usa: *3 [mensaje]*";
pub const USAGE_EARNINGS: &str = "❌ Comando incorrecto. Usa: *ganancias [hoy/mes/total]*";
pub const USAGE_RENEW: &str =
    "❌ Falta el ID del cliente. Ejemplo: *renovar C1 60* para añadir 60 días.";
pub const USAGE_ESCALATE: &str = "❌ Comando incorrecto. Usa: *aviso [ID del cliente] [1-4]*";

pub const ADMIN_MENU: &str = "---
*Menú de Administrador*
1.  Entregar cuenta (Manual)
2.  Buscar cliente
3.  Enviar promoción
4.  Ganancias (hoy, mes, total)
5.  Ayuda
---
*Comandos adicionales:*
- *renovar [ID] [días]*
- *actualizar* o *sync*
- *recordatorios*
- *aviso [ID] [1-4]*";

pub const ADMIN_HELP: &str = "---
*Comandos de Administrador*
-   *1 [ID del cliente]*: Entregar una cuenta manualmente.
-   *2 [nombre/teléfono]*: Buscar un cliente.
-   *3 [mensaje]*: Enviar una promoción a todos.
-   *ganancias [hoy/mes/total]*: Reporte de ingresos.
-   *renovar [ID del cliente] [días]*: Renovar (30 días por defecto).
-   *actualizar*: Forzar la sincronización con la hoja.
-   *recordatorios*: Ejecutar ahora la revisión de vencimientos.
-   *aviso [ID] [1-4]*: Ver el aviso de escalamiento de un cliente.
---";
