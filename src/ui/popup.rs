/// Popup UI for the Stash extension

use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::browser::{runtime_send_message, to_js};
use crate::config::ExtensionConfig;
use crate::router::{Reply, Request};
use crate::save_record::StoredSave;
use crate::supabase::User;
use crate::ui::components::{SaveList, SignInForm};

#[derive(Clone, PartialEq)]
enum PopupState {
    Idle,
    Loading(String),
    Notice(String),
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| PopupState::Loading("Loading...".to_string()));
    let user = use_state(|| None::<User>);
    let saves = use_state(Vec::<StoredSave>::new);
    let web_app_url = use_state(|| None::<String>);

    // Resolve the signed-in user on mount
    {
        let state = state.clone();
        let user = user.clone();
        let saves = saves.clone();
        let web_app_url = web_app_url.clone();
        use_effect_with((), move |_| {
            match ExtensionConfig::load() {
                Ok(config) => web_app_url.set(config.web_app_url),
                Err(e) => log::warn!("{}", e),
            }

            spawn_local(async move {
                match send(&Request::GetUser).await {
                    Ok(reply) => {
                        let signed_in = reply.user.is_some();
                        user.set(reply.user);
                        state.set(PopupState::Idle);
                        if signed_in {
                            load_recent(saves, state).await;
                        }
                    }
                    Err(e) => state.set(PopupState::Error(e)),
                }
            });
            || ()
        });
    }

    let on_sign_in = {
        let state = state.clone();
        let user = user.clone();
        let saves = saves.clone();

        Callback::from(move |(email, password): (String, String)| {
            let state = state.clone();
            let user = user.clone();
            let saves = saves.clone();

            state.set(PopupState::Loading("Signing in...".to_string()));

            spawn_local(async move {
                match send(&Request::SignIn { email, password }).await {
                    Ok(reply) => {
                        user.set(reply.user);
                        state.set(PopupState::Idle);
                        load_recent(saves, state).await;
                    }
                    Err(e) => state.set(PopupState::Error(format!("Sign in failed: {}", e))),
                }
            });
        })
    };

    let on_sign_out = {
        let state = state.clone();
        let user = user.clone();
        let saves = saves.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let user = user.clone();
            let saves = saves.clone();

            spawn_local(async move {
                match send(&Request::SignOut).await {
                    Ok(_) => {
                        user.set(None);
                        saves.set(Vec::new());
                        state.set(PopupState::Idle);
                    }
                    Err(e) => state.set(PopupState::Error(format!("Sign out failed: {}", e))),
                }
            });
        })
    };

    let on_save_page = {
        let state = state.clone();
        let saves = saves.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let saves = saves.clone();

            state.set(PopupState::Loading("Saving page...".to_string()));

            spawn_local(async move {
                match send(&Request::SavePage).await {
                    Ok(_) => {
                        state.set(PopupState::Notice("Page saved!".to_string()));
                        load_recent(saves, state).await;
                    }
                    Err(e) => state.set(PopupState::Error(e)),
                }
            });
        })
    };

    let is_busy = matches!(*state, PopupState::Loading(_));

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Stash"}</h1>

            {match &*state {
                PopupState::Loading(msg) => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{msg}</p>
                    </div>
                },
                PopupState::Notice(msg) => html! {
                    <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                    </Alert>
                },
                PopupState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                PopupState::Idle => html! {}
            }}

            {match &*user {
                None => html! {
                    <SignInForm on_submit={on_sign_in} disabled={is_busy} />
                },
                Some(signed_in) => html! {
                    <div class="flex-column-gap">
                        <p class="signed-in-as">
                            {format!("Signed in as {}", signed_in.email.clone().unwrap_or_else(|| signed_in.id.clone()))}
                        </p>
                        <Button onclick={on_save_page} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                            {"Save this page"}
                        </Button>

                        <h2 class="stats-title">{"Recent saves"}</h2>
                        <SaveList saves={(*saves).clone()} />

                        if let Some(url) = (*web_app_url).clone() {
                            <a href={url} target="_blank" rel="noopener" class="web-app-link">
                                {"Open Stash"}
                            </a>
                        }

                        <Button onclick={on_sign_out} disabled={is_busy} variant={ButtonVariant::Secondary} block={true}>
                            {"Sign out"}
                        </Button>
                    </div>
                },
            }}

            <p class="footer-popup">
                {"Stash v0.1.0"}
            </p>
        </div>
    }
}

// Helper functions

async fn send(request: &Request) -> Result<Reply, String> {
    let message = to_js(request)?;
    let reply_js = runtime_send_message(message)
        .await
        .map_err(|e| format!("Failed to reach background: {:?}", e))?;

    if reply_js.is_null() || reply_js.is_undefined() {
        return Err("No response from background".to_string());
    }

    let reply: Reply = serde_wasm_bindgen::from_value(reply_js)
        .map_err(|e| format!("Failed to parse reply: {:?}", e))?;
    reply.into_result()
}

async fn load_recent(saves: UseStateHandle<Vec<StoredSave>>, state: UseStateHandle<PopupState>) {
    match send(&Request::GetRecentSaves).await {
        Ok(reply) => saves.set(reply.saves.unwrap_or_default()),
        Err(e) => state.set(PopupState::Error(format!("Failed to load saves: {}", e))),
    }
}
