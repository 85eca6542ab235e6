/// Reusable popup components

use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::save_record::StoredSave;

#[derive(Properties, PartialEq)]
pub struct SignInFormProps {
    /// Called with `(email, password)`
    pub on_submit: Callback<(String, String)>,
    #[prop_or(false)]
    pub disabled: bool,
}

#[function_component(SignInForm)]
pub fn sign_in_form(props: &SignInFormProps) -> Html {
    let email = use_state(String::new);
    let password = use_state(String::new);

    let on_email = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                email.set(input.value());
            }
        })
    };

    let on_password = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                password.set(input.value());
            }
        })
    };

    let onsubmit = {
        let email = email.clone();
        let password = password.clone();
        let on_submit = props.on_submit.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if email.trim().is_empty() || password.is_empty() {
                return;
            }
            on_submit.emit((email.trim().to_string(), (*password).clone()));
        })
    };

    html! {
        <form class="sign-in-form" {onsubmit}>
            <input
                type="email"
                placeholder="Email"
                value={(*email).clone()}
                oninput={on_email}
                class="sign-in-input"
                disabled={props.disabled}
            />
            <input
                type="password"
                placeholder="Password"
                value={(*password).clone()}
                oninput={on_password}
                class="sign-in-input"
                disabled={props.disabled}
            />
            <button type="submit" class="pf-v5-c-button pf-m-primary pf-m-block" disabled={props.disabled}>
                {"Sign in"}
            </button>
        </form>
    }
}

#[derive(Properties, PartialEq)]
pub struct SaveListProps {
    pub saves: Vec<StoredSave>,
}

#[function_component(SaveList)]
pub fn save_list(props: &SaveListProps) -> Html {
    if props.saves.is_empty() {
        return html! {
            <p class="empty-saves">{"Nothing saved yet."}</p>
        };
    }

    html! {
        <ul class="save-list">
            {for props.saves.iter().map(|save| html! {
                <SaveItem save={save.clone()} />
            })}
        </ul>
    }
}

#[derive(Properties, PartialEq)]
pub struct SaveItemProps {
    pub save: StoredSave,
}

#[function_component(SaveItem)]
fn save_item(props: &SaveItemProps) -> Html {
    let save = &props.save;
    let kind = if save.is_highlight() { "Highlight" } else { "Page" };
    let snippet = save.highlight.clone().or_else(|| save.excerpt.clone());

    html! {
        <li class="save-item">
            <a href={save.url.clone()} target="_blank" rel="noopener" class="save-title">
                {save.display_title()}
            </a>
            <span class="save-kind">{kind}</span>
            if let Some(snippet) = snippet {
                <p class="save-snippet">{snippet}</p>
            }
        </li>
    }
}
