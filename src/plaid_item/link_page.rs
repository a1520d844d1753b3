use axum::response::{IntoResponse, Response};
use maud::{PreEscaped, html};

use crate::{
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, link},
    navigation::nav_bar,
};

const PLAID_LINK_SCRIPT_URL: &str = "https://cdn.plaid.com/link/v2/stable/link-initialize.js";

fn link_script() -> PreEscaped<String> {
    PreEscaped(format!(
        r#"
        function showLinkError(message) {{
            const element = document.getElementById("link-error");
            element.textContent = message || "Something went wrong, try again later.";
            element.hidden = false;
        }}

        async function exchangePublicToken(publicToken) {{
            const response = await fetch("{exchange_url}", {{
                method: "POST",
                credentials: "same-origin",
                headers: {{ "Content-Type": "application/json" }},
                body: JSON.stringify({{ public_token: publicToken }}),
            }});

            if (!response.ok) {{
                const body = await response.json();
                showLinkError(body.error);
                return;
            }}

            window.location.href = "{dashboard_url}";
        }}

        async function openPlaidLink() {{
            const response = await fetch("{link_token_url}", {{
                method: "POST",
                credentials: "same-origin",
            }});
            const body = await response.json();

            if (!response.ok) {{
                showLinkError(body.error);
                return;
            }}

            const handler = Plaid.create({{
                token: body.link_token,
                onSuccess: (publicToken) => exchangePublicToken(publicToken),
                onExit: (error) => {{
                    if (error) {{
                        showLinkError(error.display_message || error.error_message);
                    }}
                }},
            }});
            handler.open();
        }}
        "#,
        exchange_url = endpoints::EXCHANGE_PUBLIC_TOKEN,
        dashboard_url = endpoints::DASHBOARD_VIEW,
        link_token_url = endpoints::CREATE_LINK_TOKEN,
    ))
}

/// Display the page that opens the bank linking widget.
pub async fn get_plaid_link_page() -> Response {
    let content = html!(
        (nav_bar(endpoints::PLAID_LINK_VIEW))

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight" { "Link a Bank Account" }

                p
                {
                    "Connect a bank account to start collecting its transactions. "
                    "You will return to the dashboard once the account is linked."
                }

                button
                    id="link-button"
                    type="button"
                    class=(BUTTON_PRIMARY_STYLE)
                    onclick="openPlaidLink()"
                {
                    "Link Account"
                }

                p id="link-error" class="text-red-500 text-base" hidden {}

                p { (link(endpoints::DASHBOARD_VIEW, "Back to Dashboard")) }
            }
        }
    );

    base(
        "Link a Bank",
        &[
            HeadElement::ScriptLink(PLAID_LINK_SCRIPT_URL.to_owned()),
            HeadElement::ScriptSource(link_script()),
        ],
        &content,
    )
    .into_response()
}

#[cfg(test)]
mod link_page_tests {
    use axum::http::StatusCode;
    use scraper::Selector;

    use crate::{
        endpoints,
        test_utils::{assert_content_type, assert_valid_html, parse_html_document},
    };

    use super::{PLAID_LINK_SCRIPT_URL, get_plaid_link_page};

    #[tokio::test]
    async fn page_loads_link_widget() {
        let response = get_plaid_link_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let script_selector = Selector::parse("script[src]").unwrap();
        assert!(
            html.select(&script_selector)
                .any(|script| script.value().attr("src") == Some(PLAID_LINK_SCRIPT_URL)),
            "page should load the linking widget script"
        );

        let inline_selector = Selector::parse("script:not([src])").unwrap();
        let inline: String = html
            .select(&inline_selector)
            .flat_map(|script| script.text())
            .collect();
        assert!(inline.contains(endpoints::CREATE_LINK_TOKEN));
        assert!(inline.contains(endpoints::EXCHANGE_PUBLIC_TOKEN));

        let button_selector = Selector::parse("button#link-button").unwrap();
        assert!(html.select(&button_selector).next().is_some());
    }
}
