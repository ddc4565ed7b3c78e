//! Java host entry points
//!
//! Native methods of `com.example.dartbridge.DartBridge`. Each one converts
//! its Java arguments and forwards to the process-wide [`Bridge`](crate::Bridge).
//! The first call that sees a `JNIEnv` (`init` or `setSendChatCallback`)
//! captures the `JavaVM` and installs a [`JvmHost`], which owns the global
//! references held for the embedded side and delivers outbound chat messages.

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jboolean, jdouble, jint, jlong, jstring, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use redstone_sdk::{BlockPos, ProxyTarget, ReplacementText};

use crate::bridge::{ChatSink, HostEnvironment};
use crate::error::{BridgeError, BridgeResult};
use crate::ffi::bridge;
use crate::logging;
use crate::objects::{ObjectHandle, ObjectTable};

/// Static Java method receiving outbound chat
const CHAT_METHOD: &str = "onChatMessage";
const CHAT_SIGNATURE: &str = "(JLjava/lang/String;)V";

static HOST: OnceCell<Arc<JvmHost>> = OnceCell::new();

// ============================================================================
// Host
// ============================================================================

/// The JVM as a [`HostEnvironment`]
pub struct JvmHost {
    vm: JavaVM,
    objects: ObjectTable<GlobalRef>,
    bridge_class: RwLock<Option<GlobalRef>>,
}

impl JvmHost {
    fn new(vm: JavaVM) -> Self {
        Self {
            vm,
            objects: ObjectTable::new(),
            bridge_class: RwLock::new(None),
        }
    }

    /// Run `f` with an environment for the current thread.
    ///
    /// Threads the JVM does not know are attached for the duration of the
    /// call and detached afterwards.
    fn with_env<R>(&self, f: impl FnOnce(&mut JNIEnv) -> jni::errors::Result<R>) -> BridgeResult<R> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| BridgeError::BoundaryAttachment(e.to_string()))?;
        f(&mut env).map_err(|e| BridgeError::Host(e.to_string()))
    }

    /// Keep a Java object alive on behalf of the embedded side
    pub fn retain(&self, env: &mut JNIEnv, object: &JObject) -> BridgeResult<ObjectHandle> {
        let global = env
            .new_global_ref(object)
            .map_err(|e| BridgeError::Host(e.to_string()))?;
        Ok(self.objects.insert(global))
    }

    fn set_bridge_class(&self, env: &mut JNIEnv, class: &JClass) -> BridgeResult<()> {
        let global = env
            .new_global_ref(class)
            .map_err(|e| BridgeError::Host(e.to_string()))?;
        *self.bridge_class.write() = Some(global);
        Ok(())
    }

    fn deliver_chat(&self, player_id: i64, message: &str) {
        let Some(class) = self.bridge_class.read().clone() else {
            tracing::warn!(player_id, "chat delivery requested before setSendChatCallback");
            return;
        };

        let delivered = self.with_env(|env| {
            let jmessage = env.new_string(message)?;
            let call = env.call_static_method(
                <&JClass>::from(class.as_obj()),
                CHAT_METHOD,
                CHAT_SIGNATURE,
                &[JValue::Long(player_id), JValue::Object(&jmessage)],
            );
            if env.exception_check()? {
                env.exception_describe()?;
                env.exception_clear()?;
            }
            env.delete_local_ref(jmessage)?;
            call.map(|_| ())
        });

        if let Err(e) = delivered {
            tracing::warn!(player_id, error = %e, "chat delivery failed");
        }
    }
}

impl HostEnvironment for JvmHost {
    fn release_objects(&self) -> BridgeResult<usize> {
        // Global references are deleted on drop; keep this thread attached
        // while they go.
        self.with_env(|_| {
            let released = self.objects.drain();
            Ok(released.len())
        })
    }

    fn release_object(&self, handle: ObjectHandle) -> bool {
        let Some(global) = self.objects.remove(handle) else {
            return false;
        };
        if let Err(e) = self.with_env(move |_| {
            drop(global);
            Ok(())
        }) {
            tracing::warn!(handle = handle.as_u64(), error = %e, "object release skipped");
        }
        true
    }
}

/// Capture the JavaVM and install the host, once per process
fn host(env: &JNIEnv) -> Option<Arc<JvmHost>> {
    let installed = HOST.get_or_try_init(|| {
        let vm = env.get_java_vm()?;
        let host = Arc::new(JvmHost::new(vm));
        bridge().set_host(host.clone());
        tracing::debug!("JVM host installed");
        Ok::<_, jni::errors::Error>(host)
    });
    match installed {
        Ok(host) => Some(host.clone()),
        Err(e) => {
            tracing::error!(error = %e, "failed to capture JavaVM");
            None
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Copy a Java string; null or unreadable strings become empty
fn read_string(env: &mut JNIEnv, value: &JString) -> String {
    if value.is_null() {
        return String::new();
    }
    match env.get_string(value) {
        Ok(s) => s.into(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read Java string");
            String::new()
        }
    }
}

/// Hand a replacement to Java; pass-through becomes null
fn replacement_to_java(env: &mut JNIEnv, text: ReplacementText) -> jstring {
    let Some(text) = text.into_string() else {
        return ptr::null_mut();
    };
    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to create Java string");
            ptr::null_mut()
        }
    }
}

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// `static native boolean init(String scriptPath)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_init<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    script_path: JString<'local>,
) -> jboolean {
    logging::init_tracing();
    host(&env);

    if script_path.is_null() {
        tracing::error!("init: null script path");
        return JNI_FALSE;
    }
    let script = read_string(&mut env, &script_path);
    to_jboolean(bridge().init(Path::new(&script)).is_ok())
}

/// `static native void shutdown()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_shutdown<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    bridge().shutdown();
}

/// `static native void tick()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_tick<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    bridge().tick();
}

/// `static native String getDartServiceUrl()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_getDartServiceUrl<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jstring {
    match bridge().service_url() {
        Some(url) => replacement_to_java(&mut env, ReplacementText::Owned(url)),
        None => ptr::null_mut(),
    }
}

/// `static native void setSendChatCallback()`
///
/// Routes outbound chat to the static `onChatMessage(long, String)` of the
/// calling class.
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_setSendChatCallback<'local>(
    mut env: JNIEnv<'local>,
    class: JClass<'local>,
) {
    logging::init_tracing();
    let Some(host) = host(&env) else {
        return;
    };

    if let Err(e) = env.get_static_method_id(&class, CHAT_METHOD, CHAT_SIGNATURE) {
        tracing::error!(error = %e, "DartBridge.onChatMessage not found");
        let _ = env.exception_clear();
        return;
    }
    if let Err(e) = host.set_bridge_class(&mut env, &class) {
        tracing::error!(error = %e, "failed to keep DartBridge class");
        return;
    }

    let sink: ChatSink = Arc::new(move |player_id: i64, message: &str| {
        host.deliver_chat(player_id, message);
    });
    bridge().set_chat_sink(sink);
    tracing::info!("chat callback installed");
}

/// `static native long registerObject(Object object)`
///
/// Returns the handle, or 0 if the object could not be retained.
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_registerObject<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    object: JObject<'local>,
) -> jlong {
    let Some(host) = host(&env) else {
        return 0;
    };
    match host.retain(&mut env, &object) {
        Ok(handle) => handle.as_u64() as jlong,
        Err(e) => {
            tracing::warn!(error = %e, "registerObject failed");
            0
        }
    }
}

/// `static native boolean releaseObject(long handle)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_releaseObject<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) -> jboolean {
    to_jboolean(bridge().release_object(ObjectHandle::from_u64(handle as u64)))
}

// ============================================================================
// Block events
// ============================================================================

/// `static native int onBlockBreak(int x, int y, int z, long playerId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onBlockBreak<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    x: jint,
    y: jint,
    z: jint,
    player_id: jlong,
) -> jint {
    bridge()
        .dispatch_block_break(BlockPos::new(x, y, z), player_id)
        .code()
}

/// `static native int onBlockInteract(int x, int y, int z, long playerId, int hand)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onBlockInteract<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    x: jint,
    y: jint,
    z: jint,
    player_id: jlong,
    hand: jint,
) -> jint {
    bridge()
        .dispatch_block_interact(BlockPos::new(x, y, z), player_id, hand)
        .code()
}

/// `static native void onTick(long tick)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onTick<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    tick: jlong,
) {
    bridge().dispatch_tick(tick);
}

/// `static native boolean onProxyBlockBreak(long handlerId, long worldId, int x, int y, int z, long playerId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onProxyBlockBreak<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handler_id: jlong,
    world_id: jlong,
    x: jint,
    y: jint,
    z: jint,
    player_id: jlong,
) -> jboolean {
    let target = ProxyTarget::new(handler_id, world_id, BlockPos::new(x, y, z));
    to_jboolean(bridge().dispatch_proxy_block_break(target, player_id))
}

/// `static native int onProxyBlockUse(long handlerId, long worldId, int x, int y, int z, long playerId, int hand)`
///
/// Returns the `ActionResult` ordinal.
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onProxyBlockUse<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handler_id: jlong,
    world_id: jlong,
    x: jint,
    y: jint,
    z: jint,
    player_id: jlong,
    hand: jint,
) -> jint {
    let target = ProxyTarget::new(handler_id, world_id, BlockPos::new(x, y, z));
    bridge()
        .dispatch_proxy_block_use(target, player_id, hand)
        .code()
}

/// `static native boolean onBlockPlace(int playerId, int x, int y, int z, String blockId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onBlockPlace<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    x: jint,
    y: jint,
    z: jint,
    block_id: JString<'local>,
) -> jboolean {
    let block_id = read_string(&mut env, &block_id);
    to_jboolean(bridge().dispatch_block_place(player_id, BlockPos::new(x, y, z), &block_id))
}

// ============================================================================
// Player and entity events
// ============================================================================

/// `static native void onPlayerJoin(int playerId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerJoin<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
) {
    bridge().dispatch_player_join(player_id);
}

/// `static native void onPlayerLeave(int playerId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerLeave<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
) {
    bridge().dispatch_player_leave(player_id);
}

/// `static native void onPlayerRespawn(int playerId, boolean endConquered)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerRespawn<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    end_conquered: jboolean,
) {
    bridge().dispatch_player_respawn(player_id, end_conquered == JNI_TRUE);
}

/// `static native String onPlayerDeath(int playerId, String damageSource)`
///
/// Returns the replacement death message, or null for the default.
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerDeath<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    damage_source: JString<'local>,
) -> jstring {
    let source = read_string(&mut env, &damage_source);
    let text = bridge().dispatch_player_death(player_id, &source);
    replacement_to_java(&mut env, text)
}

/// `static native boolean onEntityDamage(int entityId, String damageSource, double amount)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onEntityDamage<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    entity_id: jint,
    damage_source: JString<'local>,
    amount: jdouble,
) -> jboolean {
    let source = read_string(&mut env, &damage_source);
    to_jboolean(bridge().dispatch_entity_damage(entity_id, &source, amount))
}

/// `static native void onEntityDeath(int entityId, String damageSource)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onEntityDeath<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    entity_id: jint,
    damage_source: JString<'local>,
) {
    let source = read_string(&mut env, &damage_source);
    bridge().dispatch_entity_death(entity_id, &source);
}

/// `static native boolean onPlayerAttackEntity(int playerId, int targetId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerAttackEntity<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    target_id: jint,
) -> jboolean {
    to_jboolean(bridge().dispatch_player_attack_entity(player_id, target_id))
}

/// `static native String onPlayerChat(int playerId, String message)`
///
/// Returns the replacement message, or null to keep the original.
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerChat<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    message: JString<'local>,
) -> jstring {
    let message = read_string(&mut env, &message);
    let text = bridge().dispatch_player_chat(player_id, &message);
    replacement_to_java(&mut env, text)
}

/// `static native boolean onPlayerCommand(int playerId, String command)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerCommand<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    command: JString<'local>,
) -> jboolean {
    let command = read_string(&mut env, &command);
    to_jboolean(bridge().dispatch_player_command(player_id, &command))
}

// ============================================================================
// Item events
// ============================================================================

/// `static native boolean onItemUse(int playerId, String itemId, int count, int hand)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onItemUse<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    item_id: JString<'local>,
    count: jint,
    hand: jint,
) -> jboolean {
    let item_id = read_string(&mut env, &item_id);
    to_jboolean(bridge().dispatch_item_use(player_id, &item_id, count, hand))
}

/// `static native int onItemUseOnBlock(int playerId, String itemId, int count, int hand, int x, int y, int z, int face)`
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onItemUseOnBlock<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    item_id: JString<'local>,
    count: jint,
    hand: jint,
    x: jint,
    y: jint,
    z: jint,
    face: jint,
) -> jint {
    let item_id = read_string(&mut env, &item_id);
    bridge()
        .dispatch_item_use_on_block(player_id, &item_id, count, hand, BlockPos::new(x, y, z), face)
        .code()
}

/// `static native int onItemUseOnEntity(int playerId, String itemId, int count, int hand, int targetId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onItemUseOnEntity<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    item_id: JString<'local>,
    count: jint,
    hand: jint,
    target_id: jint,
) -> jint {
    let item_id = read_string(&mut env, &item_id);
    bridge()
        .dispatch_item_use_on_entity(player_id, &item_id, count, hand, target_id)
        .code()
}

/// `static native boolean onPlayerPickupItem(int playerId, int itemEntityId)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerPickupItem<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    item_entity_id: jint,
) -> jboolean {
    to_jboolean(bridge().dispatch_player_pickup_item(player_id, item_entity_id))
}

/// `static native boolean onPlayerDropItem(int playerId, String itemId, int count)`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onPlayerDropItem<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    player_id: jint,
    item_id: JString<'local>,
    count: jint,
) -> jboolean {
    let item_id = read_string(&mut env, &item_id);
    to_jboolean(bridge().dispatch_player_drop_item(player_id, &item_id, count))
}

// ============================================================================
// Server lifecycle
// ============================================================================

/// `static native void onServerStarting()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onServerStarting<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    bridge().dispatch_server_starting();
}

/// `static native void onServerStarted()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onServerStarted<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    bridge().dispatch_server_started();
}

/// `static native void onServerStopping()`
#[no_mangle]
pub extern "system" fn Java_com_example_dartbridge_DartBridge_onServerStopping<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    bridge().dispatch_server_stopping();
}
