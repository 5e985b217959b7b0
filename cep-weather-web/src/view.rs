//! Server-rendered HTML for the search page.

use cep_weather_core::{HistoryStore, SearchRecord, SortDirection, SortKey, SortState};

const MISSING: &str = "Não foi localizado";

/// Everything the page needs to render once.
#[derive(Debug)]
pub struct Page<'a> {
    /// Value echoed back into the input box.
    pub cep: &'a str,
    pub outcome: Option<Result<&'a SearchRecord, String>>,
    pub history: &'a HistoryStore,
}

pub fn render(page: &Page<'_>) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n",
        "<meta charset=\"utf-8\">\n",
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        "<title>Procurar Informações do CEP</title>\n",
        "<style>",
        "body{font-family:system-ui,sans-serif;background:#f3f4f6;margin:0;padding:2rem 1rem;}",
        "main{background:#fff;max-width:40rem;margin:0 auto;padding:1.5rem;border-radius:.5rem;box-shadow:0 4px 12px rgba(0,0,0,.1);}",
        "form{display:flex;flex-direction:column;gap:1rem;}",
        "input,button{padding:.75rem;border-radius:.5rem;font-size:1rem;}",
        "input{border:1px solid #d1d5db;}",
        "button{background:#2563eb;color:#fff;border:0;cursor:pointer;}",
        ".error{color:#ef4444;text-align:center;font-weight:500;}",
        ".result{margin-top:1.5rem;background:#f9fafb;border:1px solid #e5e7eb;padding:1rem;border-radius:.5rem;}",
        "table{width:100%;margin-top:1.5rem;border-collapse:collapse;}",
        "th,td{padding:.5rem;border-bottom:1px solid #e5e7eb;text-align:left;}",
        "th a{color:inherit;text-decoration:none;}",
        "</style>\n</head>\n<body>\n<main>\n",
        "<h1>Procurar Informações do CEP</h1>\n",
    ));

    html.push_str(&format!(
        concat!(
            "<form method=\"get\" action=\"/\">\n",
            "<input type=\"text\" name=\"cep\" value=\"{}\" placeholder=\"Digite o CEP\" ",
            "inputmode=\"numeric\" maxlength=\"8\" pattern=\"[0-9]{{8}}\" autocomplete=\"off\" ",
            "oninput=\"this.value=this.value.replace(/\\D/g,'').slice(0,8)\">\n",
            "<button type=\"submit\">Buscar</button>\n",
            "</form>\n",
        ),
        escape(page.cep)
    ));

    match &page.outcome {
        Some(Ok(record)) => render_result(&mut html, record),
        Some(Err(message)) => {
            html.push_str(&format!("<p class=\"error\">{}</p>\n", escape(message)));
        }
        None => {}
    }

    render_history(&mut html, page.history);

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_result(html: &mut String, record: &SearchRecord) {
    html.push_str(&format!(
        concat!(
            "<div class=\"result\">\n",
            "<p><strong>CEP: </strong>{}</p>\n",
            "<p><strong>Cidade: </strong>{}</p>\n",
            "<p><strong>Estado: </strong>{}</p>\n",
            "<p><strong>Temperatura: </strong>{}</p>\n",
            "<p><strong>Hora da pesquisa: </strong>{}</p>\n",
            "</div>\n",
        ),
        escape(record.cep.as_str()),
        escape(text_or_missing(record.location.as_deref())),
        escape(text_or_missing(record.local_state.as_deref())),
        temperature(record.temp),
        escape(text_or_missing(Some(record.timestamp.as_str()))),
    ));
}

fn render_history(html: &mut String, history: &HistoryStore) {
    if history.is_empty() {
        return;
    }

    html.push_str("<table>\n<thead>\n<tr>");
    for key in SortKey::all() {
        let next = SortState::toggle(history.sort_state(), *key);
        let marker = match history.sort_state() {
            Some(SortState { key: active, direction: SortDirection::Asc }) if active == *key => " ▲",
            Some(SortState { key: active, direction: SortDirection::Desc }) if active == *key => " ▼",
            _ => "",
        };
        html.push_str(&format!(
            "<th><a href=\"/?sort={}&amp;dir={}\">{}{}</a></th>",
            key.as_str(),
            next.direction.as_str(),
            column_label(*key),
            marker
        ));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for record in history.sorted() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape(record.cep.as_str()),
            escape(text_or_missing(record.location.as_deref())),
            escape(text_or_missing(record.local_state.as_deref())),
            temperature(record.temp),
            escape(&record.timestamp),
        ));
    }
    html.push_str("</tbody>\n</table>\n");
}

fn column_label(key: SortKey) -> &'static str {
    match key {
        SortKey::Cep => "CEP",
        SortKey::Location => "Cidade",
        SortKey::LocalState => "Estado",
        SortKey::Temp => "Temperatura",
        SortKey::Timestamp => "Hora da pesquisa",
    }
}

fn text_or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(MISSING)
}

/// Whole degrees, rounding halves up.
fn temperature(temp: Option<f64>) -> String {
    match temp {
        Some(t) => format!("{}°C", (t + 0.5).floor() as i64),
        None => MISSING.to_string(),
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_weather_core::{Cep, UpsertStrategy};

    fn record(cep: &str, location: Option<&str>, temp: Option<f64>) -> SearchRecord {
        SearchRecord {
            cep: Cep::parse(cep).unwrap(),
            location: location.map(str::to_string),
            local_state: Some("SP".into()),
            temp,
            timestamp: "19/10/2026, 14:05".into(),
        }
    }

    #[test]
    fn renders_result_card_with_fallbacks() {
        let rec = record("01001000", None, Some(21.5));
        let history = HistoryStore::new();
        let html = render(&Page { cep: "01001000", outcome: Some(Ok(&rec)), history: &history });

        assert!(html.contains("<strong>Cidade: </strong>Não foi localizado"));
        assert!(html.contains("<strong>Temperatura: </strong>22°C"));
        assert!(html.contains("value=\"01001000\""));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn renders_error_escaped() {
        let history = HistoryStore::new();
        let html = render(&Page {
            cep: "\"><script>",
            outcome: Some(Err("<b>falhou</b>".into())),
            history: &history,
        });

        assert!(html.contains("<p class=\"error\">&lt;b&gt;falhou&lt;/b&gt;</p>"));
        assert!(html.contains("value=\"&quot;&gt;&lt;script&gt;\""));
    }

    #[test]
    fn header_links_toggle_active_column() {
        let history = HistoryStore::new()
            .upsert(record("11111111", Some("Recife"), Some(30.0)), UpsertStrategy::MoveToFront)
            .upsert(record("22222222", Some("Porto Alegre"), Some(12.0)), UpsertStrategy::MoveToFront)
            .sort(SortKey::Temp);
        let html = render(&Page { cep: "", outcome: None, history: &history });

        assert!(html.contains("href=\"/?sort=temp&amp;dir=desc\">Temperatura ▲</a>"));
        assert!(html.contains("href=\"/?sort=location&amp;dir=asc\">Cidade</a>"));

        let porto = html.find("Porto Alegre").unwrap();
        let recife = html.find("Recife").unwrap();
        assert!(porto < recife, "ascending temperature puts the colder city first");
    }

    #[test]
    fn temperature_rounds_like_the_browser() {
        assert_eq!(temperature(Some(2.5)), "3°C");
        assert_eq!(temperature(Some(-0.4)), "0°C");
        assert_eq!(temperature(Some(-2.5)), "-2°C");
        assert_eq!(temperature(None), MISSING);
    }
}
