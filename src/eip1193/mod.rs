pub mod error;
pub mod provider;
pub mod request;

use crate::{
    eip1193::{error::Eip1193Error, provider::InjectedProvider, request::Eip1193Request},
    event::WalletEvent,
};
use futures::channel::oneshot;
use gloo_utils::format::JsValueSerdeExt;
use log::trace;
use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::{closure::Closure, JsValue};
use wasm_bindgen_futures::spawn_local;

#[derive(Debug, Clone)]
// The injected provider is a JS object and is neither Send nor Sync.
// Nothing is cached here; `window.ethereum` is looked up on every call.
pub(crate) struct Eip1193 {}

impl Default for Eip1193 {
    fn default() -> Self {
        Self::new()
    }
}

impl Eip1193 {
    /// Sends the request via `window.ethereum` in Js
    pub async fn request<T: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, Eip1193Error> {
        let (sender, receiver) = oneshot::channel();

        let m = method.to_string();
        trace!("eip1193 request {m}");

        let parsed_params = parse_params(params);
        spawn_local(async move {
            let res = match (InjectedProvider::default_opt(), parsed_params) {
                (Ok(ethereum), Ok(params)) => {
                    let payload = Eip1193Request::new(m, params);
                    match ethereum.request(payload).await {
                        Ok(r) => stringify(&r),
                        Err(e) => Err(e.into()),
                    }
                }
                (Err(e), _) | (_, Err(e)) => Err(e),
            };
            _ = sender.send(res);
        });

        let res = receiver.await.map_err(|_| Eip1193Error::CommunicationError)?;
        Ok(serde_json::from_str(&res?)?)
    }

    pub fn is_available() -> bool {
        InjectedProvider::default_opt().is_ok()
    }

    pub fn new() -> Self {
        Eip1193 {}
    }

    /// Subscribes `callback` to a wallet event. The closure lives as long as the page does.
    pub fn on(
        &self,
        event: WalletEvent,
        callback: Box<dyn FnMut(JsValue)>,
    ) -> Result<(), Eip1193Error> {
        let ethereum = InjectedProvider::default_opt()?;
        let closure = Closure::wrap(callback);
        ethereum.on(event.as_str(), &closure);
        closure.forget();
        Ok(())
    }
}

fn stringify(value: &JsValue) -> Result<String, Eip1193Error> {
    // `undefined` results (e.g. from some wallet_* methods) do not stringify
    if value.is_undefined() {
        return Ok("null".to_string());
    }
    match js_sys::JSON::stringify(value) {
        Ok(s) => s.as_string().ok_or(Eip1193Error::JsParseError),
        Err(err) => Err(err.into()),
    }
}

/// Normalises a transaction `type` the way MetaMask expects it.
/// ethers serialises `0x02` while MetaMask only accepts `0x2`.
pub(crate) fn normalize_tx_type(tx_type: &str) -> Option<&'static str> {
    match tx_type {
        "0x01" => Some("0x1"),
        "0x02" => Some("0x2"),
        "0x03" => Some("0x3"),
        _ => None,
    }
}

fn parse_params<T: Serialize>(params: T) -> Result<JsValue, Eip1193Error> {
    let t_params = JsValue::from_serde(&params)?;
    if t_params.is_null() {
        return Ok(js_sys::Array::new().into());
    }

    let typename_object = JsValue::from_str("type");
    let mut error = None;
    let normalized = js_sys::Array::from(&t_params)
        .map(&mut |val, _, _| {
            let Some(trans) = js_sys::Object::try_from(&val) else {
                return val;
            };
            let Some(tx_type) = js_sys::Reflect::get(trans, &typename_object)
                .ok()
                .and_then(|t| t.as_string())
            else {
                return val;
            };
            let Some(fixed) = normalize_tx_type(&tx_type) else {
                return val;
            };

            let t_copy = trans.clone();
            match js_sys::Reflect::set(&t_copy, &typename_object, &JsValue::from_str(fixed)) {
                Ok(_) => t_copy.into(),
                Err(e) => {
                    error = Some(Eip1193Error::JsValueError(format!("{:?}", e)));
                    js_sys::Array::new().into()
                }
            }
        })
        .into();

    match error {
        Some(e) => Err(e),
        None => Ok(normalized),
    }
}


#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use ethers::prelude::H160;
    use serde_json::json;
    use std::str::FromStr;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_empty_params_become_empty_array() {
        // arrange
        let params = ();

        // act
        let js_value = parse_params(params).unwrap();

        // assert
        let js_array = js_value.dyn_into::<js_sys::Array>().unwrap();
        assert_eq!(js_array.length(), 0);
    }

    #[wasm_bindgen_test]
    fn test_address_params_are_passed_through() {
        // arrange
        let params = [H160::from_str("0x31D4A708962291e9fd61e5B04607D79B26507ce6").unwrap()];

        // act
        let js_value = parse_params(params).unwrap();

        // assert
        let js_array = js_value.dyn_into::<js_sys::Array>().unwrap();
        assert_eq!(js_array.length(), 1);
        assert_eq!(
            js_array.get(0).as_string().unwrap(),
            "0x31d4a708962291e9fd61e5b04607d79b26507ce6"
        );
    }

    #[wasm_bindgen_test]
    fn test_eip1559_transaction_type_is_rewritten() {
        // arrange
        let params = json!([{
            "type": "0x02",
            "from": "0x0000000000000000000000000000000000000001",
            "to": "0x31d4a708962291e9fd61e5b04607d79b26507ce6",
            "data": "0xa4c1d7bf",
        }]);

        // act
        let js_value = parse_params(params).unwrap();

        // assert
        let js_array = js_value.dyn_into::<js_sys::Array>().unwrap();
        assert_eq!(js_array.length(), 1);
        let tx_type = js_sys::Reflect::get(&js_array.get(0), &JsValue::from_str("type")).unwrap();
        assert_eq!(tx_type.as_string().unwrap(), "0x2");
    }
}
