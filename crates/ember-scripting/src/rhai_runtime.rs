//! In-tree rhai embedding of [`ManagedRuntime`].
//!
//! rhai has no classes, so the mapping is by convention: an assembly is one
//! compiled script whose name doubles as its class name. An instance is the
//! state map returned by the script's `init()` function; every method takes
//! that state as its first argument and may return an updated map, which
//! replaces the stored state.

use std::collections::HashMap;

use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use tracing::info;

use crate::error::{ScriptError, ScriptFault};
use crate::runtime::{InstanceId, ManagedRuntime};
use crate::value::ScriptValue;

struct Instance {
    module: String,
    state: rhai::Map,
}

pub struct RhaiRuntime {
    engine: Engine,
    modules: HashMap<String, AST>,
    instances: HashMap<u64, Instance>,
    next_instance: u64,
}

impl RhaiRuntime {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.on_print(|text| info!(target: "script", "{text}"));
        Self {
            engine,
            modules: HashMap::new(),
            instances: HashMap::new(),
            next_instance: 0,
        }
    }
}

impl Default for RhaiRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Unit => Dynamic::UNIT,
        ScriptValue::Bool(b) => (*b).into(),
        ScriptValue::Int(i) => (*i).into(),
        ScriptValue::Float(f) => (*f).into(),
        ScriptValue::Str(s) => s.clone().into(),
    }
}

fn from_dynamic(value: Dynamic) -> ScriptValue {
    if value.is_unit() {
        ScriptValue::Unit
    } else if let Ok(b) = value.as_bool() {
        ScriptValue::Bool(b)
    } else if let Ok(i) = value.as_int() {
        ScriptValue::Int(i)
    } else if let Ok(f) = value.as_float() {
        ScriptValue::Float(f)
    } else if value.is_string() {
        ScriptValue::Str(value.into_string().unwrap_or_default())
    } else {
        ScriptValue::Unit
    }
}

fn is_function_not_found(err: &EvalAltResult) -> bool {
    matches!(err, EvalAltResult::ErrorFunctionNotFound(..))
}

impl ManagedRuntime for RhaiRuntime {
    fn load_assembly(&mut self, name: &str, bytes: &[u8]) -> Result<(), ScriptError> {
        let source = std::str::from_utf8(bytes)
            .map_err(|e| ScriptError::LoadFailed(name.to_string(), e.to_string()))?;
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| ScriptError::LoadFailed(name.to_string(), e.to_string()))?;
        self.modules.insert(name.to_string(), ast);
        Ok(())
    }

    fn unload_all(&mut self) {
        self.modules.clear();
        self.instances.clear();
    }

    fn has_class(&self, class: &str) -> bool {
        self.modules.contains_key(class)
    }

    fn create_instance(&mut self, class: &str) -> Result<InstanceId, ScriptError> {
        let ast = self
            .modules
            .get(class)
            .ok_or_else(|| ScriptError::UnknownClass(class.to_string()))?;

        let state = match self
            .engine
            .call_fn::<Dynamic>(&mut Scope::new(), ast, "init", ())
        {
            Ok(value) => value.try_cast::<rhai::Map>().unwrap_or_default(),
            // A script without init() starts from an empty state map.
            Err(e) if is_function_not_found(&e) => rhai::Map::new(),
            Err(e) => {
                return Err(ScriptError::InstanceFailed(
                    class.to_string(),
                    e.to_string(),
                ))
            }
        };

        self.next_instance += 1;
        self.instances.insert(
            self.next_instance,
            Instance {
                module: class.to_string(),
                state,
            },
        );
        Ok(InstanceId(self.next_instance))
    }

    fn destroy_instance(&mut self, instance: InstanceId) {
        self.instances.remove(&instance.0);
    }

    fn invoke(
        &mut self,
        instance: InstanceId,
        method: &str,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptFault> {
        let Some(inst) = self.instances.get(&instance.0) else {
            return Err(ScriptFault::Exception(
                method.to_string(),
                "instance destroyed".to_string(),
            ));
        };
        let Some(ast) = self.modules.get(&inst.module) else {
            return Err(ScriptFault::Exception(
                method.to_string(),
                format!("module '{}' unloaded", inst.module),
            ));
        };

        let mut call_args: Vec<Dynamic> = Vec::with_capacity(args.len() + 1);
        call_args.push(Dynamic::from(inst.state.clone()));
        call_args.extend(args.iter().map(to_dynamic));

        match self
            .engine
            .call_fn::<Dynamic>(&mut Scope::new(), ast, method, call_args)
        {
            Ok(result) => {
                // A returned map is the updated state; anything else is a
                // plain return value.
                if result.is_map() {
                    if let Some(state) = result.try_cast::<rhai::Map>() {
                        if let Some(inst) = self.instances.get_mut(&instance.0) {
                            inst.state = state;
                        }
                    }
                    Ok(ScriptValue::Unit)
                } else {
                    Ok(from_dynamic(result))
                }
            }
            Err(e) if is_function_not_found(&e) => {
                Err(ScriptFault::MethodNotFound(method.to_string()))
            }
            Err(e) => Err(ScriptFault::Exception(method.to_string(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
        fn init() {
            #{ count: 0 }
        }

        fn on_update(state, dt) {
            state.count += 1;
            state
        }
    "#;

    fn runtime_with(name: &str, source: &str) -> RhaiRuntime {
        let mut runtime = RhaiRuntime::new();
        runtime.load_assembly(name, source.as_bytes()).unwrap();
        runtime
    }

    #[test]
    fn compile_failure_is_reported() {
        let mut runtime = RhaiRuntime::new();
        let err = runtime.load_assembly("broken", b"fn init( {").unwrap_err();
        assert!(matches!(err, ScriptError::LoadFailed(_, _)));
        assert!(!runtime.has_class("broken"));
    }

    #[test]
    fn state_map_persists_across_invocations() {
        let mut runtime = runtime_with("counter", COUNTER);
        let instance = runtime.create_instance("counter").unwrap();

        for _ in 0..3 {
            let result = runtime
                .invoke(instance, "on_update", &[ScriptValue::Float(0.016)])
                .unwrap();
            assert!(result.is_unit());
        }
        let count = runtime.instances[&instance.0].state["count"].clone();
        assert_eq!(count.as_int(), Ok(3));
    }

    #[test]
    fn missing_method_is_distinguishable_from_exception() {
        let mut runtime = runtime_with(
            "faulty",
            r#"
                fn boom(state) {
                    throw "bad state";
                }
            "#,
        );
        let instance = runtime.create_instance("faulty").unwrap();

        let missing = runtime.invoke(instance, "no_such_method", &[]).unwrap_err();
        assert!(matches!(missing, ScriptFault::MethodNotFound(_)));

        let fault = runtime.invoke(instance, "boom", &[]).unwrap_err();
        assert!(matches!(fault, ScriptFault::Exception(_, _)));
    }

    #[test]
    fn script_without_init_gets_empty_state() {
        let mut runtime = runtime_with("bare", "fn poke(state) { 41 + 1 }");
        let instance = runtime.create_instance("bare").unwrap();
        assert!(runtime.instances[&instance.0].state.is_empty());
        // A non-map return marshals as a value, leaving the state alone.
        assert_eq!(
            runtime.invoke(instance, "poke", &[]),
            Ok(ScriptValue::Int(42))
        );
    }

    #[test]
    fn arguments_marshal_into_script_scope() {
        let mut runtime = runtime_with(
            "greeter",
            r#"
                fn init() {
                    #{ greeting: "" }
                }

                fn greet(state, name) {
                    state.greeting = "hello " + name;
                    state
                }
            "#,
        );
        let instance = runtime.create_instance("greeter").unwrap();
        runtime
            .invoke(instance, "greet", &[ScriptValue::from("ember")])
            .unwrap();
        let greeting = runtime.instances[&instance.0].state["greeting"].clone();
        assert_eq!(greeting.into_string(), Ok("hello ember".to_string()));
    }

    #[test]
    fn unload_all_drops_modules_and_instances() {
        let mut runtime = runtime_with("counter", COUNTER);
        let instance = runtime.create_instance("counter").unwrap();
        runtime.unload_all();
        assert!(!runtime.has_class("counter"));
        assert!(runtime.invoke(instance, "on_update", &[]).is_err());
    }
}
