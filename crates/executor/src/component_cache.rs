use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use ai_optimizer_domain::SystemComponents;

use crate::facade::SystemFacade;

/// 最近一次完整组件扫描的限时缓存
///
/// 扫描时不持锁，并发的扫描以最后写入者为准。
pub struct ComponentCache {
    ttl: Duration,
    slot: Mutex<Option<(SystemComponents, Instant)>>,
}

impl ComponentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_scan(&self, facade: &dyn SystemFacade) -> SystemComponents {
        {
            let slot = self.slot.lock().await;
            if let Some((components, captured_at)) = slot.as_ref() {
                if captured_at.elapsed() < self.ttl {
                    log::debug!("using cached component scan");
                    return components.clone();
                }
            }
        }

        let components = scan_components(facade).await;
        *self.slot.lock().await = Some((components.clone(), Instant::now()));
        components
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

/// 并发枚举服务与打包应用，失败的一侧以空列表代替
pub async fn scan_components(facade: &dyn SystemFacade) -> SystemComponents {
    let (services, apps) =
        tokio::join!(facade.enumerate_services(), facade.enumerate_packaged_apps());
    let services = services.unwrap_or_else(|e| {
        log::warn!("service enumeration failed: {}", e);
        Vec::new()
    });
    let packaged_apps = apps.unwrap_or_else(|e| {
        log::warn!("packaged app enumeration failed: {}", e);
        Vec::new()
    });
    log::info!(
        "found {} services and {} packaged apps",
        services.len(),
        packaged_apps.len()
    );
    SystemComponents {
        services,
        packaged_apps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::testing::FakeFacade;
    use std::sync::atomic::Ordering;

    #[tokio::test(start_paused = true)]
    async fn reuses_scan_within_ttl_and_rescans_after() {
        let facade = FakeFacade::with_services(&["Fax"]);
        let cache = ComponentCache::new(Duration::from_secs(300));

        let first = cache.get_or_scan(&facade).await;
        assert_eq!(first.services.len(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache.get_or_scan(&facade).await;
        assert_eq!(second, first);
        assert_eq!(facade.enumerations.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(241)).await;
        cache.get_or_scan(&facade).await;
        assert_eq!(facade.enumerations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_a_fresh_scan() {
        let facade = FakeFacade::with_services(&["Fax"]);
        let cache = ComponentCache::new(Duration::from_secs(300));

        cache.get_or_scan(&facade).await;
        cache.invalidate().await;
        cache.get_or_scan(&facade).await;
        assert_eq!(facade.enumerations.load(Ordering::SeqCst), 2);
    }
}
