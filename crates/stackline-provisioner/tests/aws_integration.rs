//! AWS integration tests - actually call AWS APIs
//!
//! These tests are marked `#[ignore]` and only run with:
//! ```
//! AWS_PROFILE=your_profile cargo test -p stackline-provisioner --test aws_integration -- --ignored --nocapture
//! ```
//!
//! The end-to-end test creates a real load balancer and Fargate service and
//! takes several minutes. Resources are tagged with the run's deployment ID
//! and deleted at the end of the test.

use stackline_common::ResourceKind;
use stackline_provisioner::aws::{AwsContext, EcsClient, NetworkClient};
use stackline_provisioner::{AwsProvider, DeployConfig, Provisioner, ResourceHandle, ResourceRecord};
use stackline_test_utils::aws::{get_test_region, test_run_id};

#[tokio::test]
#[ignore]
async fn test_default_network_discovery() {
    let ctx = AwsContext::new(&get_test_region()).await;
    let network = NetworkClient::from_context(&ctx)
        .resolve(&[], &[])
        .await
        .expect("AWS credentials and a default VPC required");

    assert!(network.vpc_id.starts_with("vpc-"));
    assert!(!network.subnet_ids.is_empty());
    assert!(network.subnet_ids.iter().all(|s| s.starts_with("subnet-")));
}

#[tokio::test]
#[ignore]
async fn test_find_missing_cluster() {
    let ctx = AwsContext::new(&get_test_region()).await;
    let ecs = EcsClient::from_context(&ctx);

    let found = ecs
        .find_cluster(&format!("{}-missing", test_run_id()))
        .await
        .expect("AWS credentials required");
    assert!(found.is_none());
}

/// Provision the reference deployment with a public nginx image, check the
/// exported address, then delete everything
#[tokio::test]
#[ignore]
async fn test_provision_reference_deployment() {
    let region = get_test_region();
    let run_id = test_run_id();
    let config = DeployConfig {
        region: region.clone(),
        cluster_name: format!("{run_id}-c"),
        load_balancer_name: format!("{run_id}-lb"),
        target_group_name: format!("{run_id}-tg"),
        service_name: format!("{run_id}-s"),
        container_name: "web".to_string(),
        container_port: 80,
        desired_count: 1,
        ..DeployConfig::new("public.ecr.aws/nginx/nginx:latest")
    };
    config.check().unwrap();

    let ctx = AwsContext::new(&region).await;
    let provider = AwsProvider::new(&ctx, &[], &[], config.task_settings(), run_id.clone())
        .await
        .expect("AWS credentials and a default VPC required");
    let provisioner = Provisioner::new(provider);

    let result = provisioner.provision(&config.topology()).await;
    let records = provisioner.ledger().snapshot();
    cleanup(&ctx, &records).await;

    let report = result.expect("Provisioning should succeed");
    let address = report.address().expect("One external load balancer");
    println!("Provisioned http://{address}");
    assert!(address.ends_with(".elb.amazonaws.com"));
    assert_eq!(report.resources.len(), 4);
}

/// Best-effort deletion of everything a run created, dependents first
async fn cleanup(ctx: &AwsContext, records: &[ResourceRecord]) {
    let ecs = ctx.ecs_client();
    let elb = ctx.elb_client();
    let handle = |kind: ResourceKind| {
        records
            .iter()
            .filter(move |r| r.resource.kind == kind)
            .filter_map(|r| r.handle.clone())
    };

    for service in handle(ResourceKind::Service) {
        if let ResourceHandle::Service(service) = service {
            if let Err(e) = ecs
                .delete_service()
                .cluster(&service.cluster_arn)
                .service(&service.name)
                .force(true)
                .send()
                .await
            {
                println!("Failed to delete service {}: {e}", service.name);
            }
            let _ = ecs
                .deregister_task_definition()
                .task_definition(&service.task_definition_arn)
                .send()
                .await;
        }
    }

    for lb in handle(ResourceKind::LoadBalancer) {
        if let Err(e) = elb.delete_load_balancer().load_balancer_arn(lb.arn()).send().await {
            println!("Failed to delete load balancer {}: {e}", lb.arn());
        }
    }

    // Target groups stay in use until their listeners are gone
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    for tg in handle(ResourceKind::TargetGroup) {
        if let Err(e) = elb.delete_target_group().target_group_arn(tg.arn()).send().await {
            println!("Failed to delete target group {}: {e}", tg.arn());
        }
    }

    // Clusters cannot be deleted while services are draining
    tokio::time::sleep(std::time::Duration::from_secs(60)).await;
    for cluster in handle(ResourceKind::Cluster) {
        if let Err(e) = ecs.delete_cluster().cluster(cluster.arn()).send().await {
            println!("Failed to delete cluster {}: {e}", cluster.arn());
        }
    }
}
