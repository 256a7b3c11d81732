use super::mock_test_prelude::*;

// Node 0 holds the only DMA zone. Node 1 holds the only high memory.
fn split_zones() -> crate::PolicyEngine<MockBinding> {
    let topology = MockTopology::builder()
        .node(0, &[ZoneType::Dma, ZoneType::Normal])
        .node(1, &[ZoneType::Normal, ZoneType::HighMem])
        .local(0)
        .build();
    mock_engine_with(topology, |_| {})
}

#[test]
pub fn low_zone_requests_bypass_bind() {
    let engine = split_zones();
    let bind = memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("1")).unwrap();
    assert_eq!(engine.binding().allocator.policy_zone().get(), ZoneType::HighMem);
    let task = TaskPolicy::with_policy(bind);

    // Below the watermark: the bind policy does not apply and the local node serves it.
    let dma = memory_manager::alloc_page_current(&engine, &task, Gfp::DMA).unwrap();
    assert_eq!(dma.node(), NodeId::new(0));
    let kernel = memory_manager::alloc_page_current(&engine, &task, Gfp::KERNEL).unwrap();
    assert_eq!(kernel.node(), NodeId::new(0));

    // At the watermark: bound to node 1.
    let user = memory_manager::alloc_page_current(&engine, &task, Gfp::HIGHUSER).unwrap();
    assert_eq!(user.node(), NodeId::new(1));
}

#[test]
pub fn bypass_follows_the_local_node() {
    let engine = split_zones();
    let bind = memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("0")).unwrap();
    // Node 0 has nothing above normal memory.
    assert_eq!(engine.binding().allocator.policy_zone().get(), ZoneType::Normal);
    let task = TaskPolicy::with_policy(bind);

    engine.binding().topology.set_local_node(NodeId::new(1));
    // A DMA request bypasses the bind and is served by the local node, outside the bound nodes.
    let dma = memory_manager::alloc_page_current(&engine, &task, Gfp::DMA).unwrap();
    assert_eq!(dma.node(), NodeId::new(1));
    let normal = memory_manager::alloc_page_current(&engine, &task, Gfp::KERNEL).unwrap();
    assert_eq!(normal.node(), NodeId::new(0));
}

#[test]
pub fn watermark_only_rises() {
    let engine = split_zones();
    memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("1")).unwrap();
    memory_manager::new_policy(&engine, PolicyMode::Bind, &nodes("0")).unwrap();
    assert_eq!(engine.binding().allocator.policy_zone().get(), ZoneType::HighMem);
}
