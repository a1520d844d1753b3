//! The navigation bar shown on pages that require a session.

use maud::{Markup, html};

use crate::endpoints;

/// A link in the navigation bar.
///
/// Only one link should be marked as current at any one time.
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

impl Link<'_> {
    fn into_html(self) -> Markup {
        let style = if self.is_current {
            "block py-2 px-3 text-white bg-blue-700 rounded-sm md:bg-transparent \
            md:text-blue-700 md:p-0 dark:text-white md:dark:text-blue-500"
        } else {
            "block py-2 px-3 text-gray-900 rounded-sm hover:bg-gray-100 \
            md:hover:bg-transparent md:border-0 md:hover:text-blue-700 md:p-0 \
            dark:text-white md:dark:hover:text-blue-500 dark:hover:bg-gray-700"
        };

        html!(
            a
                href=(self.url)
                class=(style)
                aria-current=[self.is_current.then_some("page")]
            { (self.title) }
        )
    }
}

/// Render the navigation bar with the link for `active_endpoint` highlighted.
pub fn nav_bar(active_endpoint: &str) -> Markup {
    let links = [
        (endpoints::DASHBOARD_VIEW, "Dashboard"),
        (endpoints::PLAID_LINK_VIEW, "Link a Bank"),
        (endpoints::LOG_OUT, "Log out"),
    ]
    .map(|(url, title)| Link {
        url,
        title,
        is_current: url == active_endpoint,
    });

    // Template adapted from https://flowbite.com/docs/components/navbar/#default-navbar
    html!(
        nav class="bg-white border-gray-200 dark:bg-gray-900"
        {
            div
                class="max-w-screen-xl flex flex-wrap items-center justify-between mx-auto p-4"
            {
                a href=(endpoints::DASHBOARD_VIEW)
                {
                    span
                        class="self-center text-2xl font-semibold whitespace-nowrap dark:text-white"
                    {
                        "Expense Tracker"
                    }
                }

                ul class="font-medium flex flex-row space-x-8"
                {
                    @for link in links
                    {
                        li { (link.into_html()) }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod nav_bar_tests {
    use scraper::{Html, Selector};

    use crate::endpoints;

    use super::nav_bar;

    #[test]
    fn marks_only_active_link_as_current() {
        let html = Html::parse_fragment(&nav_bar(endpoints::PLAID_LINK_VIEW).into_string());

        let selector = Selector::parse("a[aria-current=page]").unwrap();
        let current: Vec<_> = html.select(&selector).collect();

        assert_eq!(current.len(), 1);
        assert_eq!(current[0].value().attr("href"), Some(endpoints::PLAID_LINK_VIEW));
    }

    #[test]
    fn includes_log_out_link() {
        let html = Html::parse_fragment(&nav_bar(endpoints::DASHBOARD_VIEW).into_string());

        let selector = Selector::parse("li a").unwrap();
        let hrefs: Vec<_> = html
            .select(&selector)
            .filter_map(|link| link.value().attr("href"))
            .collect();

        assert_eq!(
            hrefs,
            vec![
                endpoints::DASHBOARD_VIEW,
                endpoints::PLAID_LINK_VIEW,
                endpoints::LOG_OUT
            ]
        );
    }
}
